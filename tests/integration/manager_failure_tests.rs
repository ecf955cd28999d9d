/*!
 * Business failures and rollback behavior of the model manager
 */

use std::thread;

use modelstore::{AddError, DeleteError, GetError, StoreError, UpdateError};

use crate::common::{
    Student, StudentId, create_enrollment_managers, create_student_manager, enrollment, student,
};

#[test]
fn test_get_withNeverAddedId_shouldFailWithNotFound() {
    let manager = create_student_manager();

    match manager.get(&StudentId(404)) {
        Err(GetError::NotFound(failure)) => assert_eq!(failure.id, StudentId(404)),
        other => panic!("Expected not found, got {:?}", other),
    }

    let stats = manager.factory().stats();
    assert_eq!(stats.sessions_open, 0);
    assert_eq!(stats.rollbacks, 1);
}

#[test]
fn test_updateAndDelete_withUnknownId_shouldFailAndLeaveStoreUnchanged() {
    let manager = create_student_manager();
    manager.add(&mut student("M-200", "Ada")).unwrap();
    let before = manager.list_all().unwrap();

    let mut ghost = student("M-201", "Ghost");
    ghost.id = Some(StudentId(999));

    assert!(matches!(manager.update(&ghost), Err(UpdateError::NotFound(_))));
    assert!(matches!(manager.delete(&ghost), Err(DeleteError::NotFound(_))));

    let after = manager.list_all().unwrap();
    assert_eq!(before, after);
    assert_eq!(before[0].name, after[0].name);
    assert_eq!(manager.factory().stats().sessions_open, 0);
}

#[test]
fn test_updateAndDelete_withoutIdentifier_shouldFailBeforeOpeningSession() {
    let manager = create_student_manager();
    let blank = student("M-202", "Never added");

    match manager.update(&blank) {
        Err(UpdateError::NotAdded(failure)) => {
            assert_eq!(failure.entity.matriculation.as_deref(), Some("M-202"))
        }
        other => panic!("Expected not added, got {:?}", other),
    }
    assert!(matches!(manager.delete(&blank), Err(DeleteError::NotAdded(_))));
    assert_eq!(manager.factory().stats().sessions_opened, 0);
}

#[test]
fn test_add_withMissingRequiredField_shouldFailAndAddNoRow() {
    let manager = create_student_manager();
    let mut nameless = Student {
        matriculation: Some("M-203".to_string()),
        ..Student::default()
    };

    match manager.add(&mut nameless) {
        Err(AddError::MissingProperty(failure)) => {
            assert_eq!(failure.entity.matriculation.as_deref(), Some("M-203"));
            assert!(matches!(failure.cause, StoreError::MissingProperty(_)));
        }
        other => panic!("Expected missing property, got {:?}", other),
    }

    assert!(nameless.id.is_none());
    assert!(manager.list_all().unwrap().is_empty());
    assert_eq!(manager.factory().stats().rollbacks, 1);
}

#[test]
fn test_add_withDuplicateMatriculation_shouldKeepOnlyFirstRow() {
    let manager = create_student_manager();
    let mut first = student("M-204", "First");
    manager.add(&mut first).unwrap();

    match manager.add(&mut student("M-204", "Second")) {
        Err(AddError::ConstraintViolation(failure)) => {
            assert_eq!(failure.entity.name.as_deref(), Some("Second"));
            assert!(matches!(failure.cause, StoreError::ConstraintViolation(_)));
        }
        other => panic!("Expected constraint violation, got {:?}", other),
    }

    let stored = manager.list_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name.as_deref(), Some("First"));
    assert_eq!(manager.factory().stats().sessions_open, 0);
}

#[test]
fn test_update_clearingRequiredField_shouldFailWithMissingProperty() {
    let manager = create_student_manager();
    let mut ada = student("M-205", "Ada");
    let id = manager.add(&mut ada).unwrap();

    ada.name = None;
    match manager.update(&ada) {
        Err(UpdateError::MissingProperty(failure)) => assert_eq!(failure.entity.id, Some(id)),
        other => panic!("Expected missing property, got {:?}", other),
    }

    assert_eq!(manager.get(&id).unwrap().name.as_deref(), Some("Ada"));
    assert_eq!(manager.factory().stats().rollbacks, 1);
}

#[test]
fn test_concurrentAdds_shouldEachGetExclusiveSession() {
    let manager = create_student_manager();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = manager.clone();
            thread::spawn(move || manager.add(&mut student(&format!("M-3{:02}", i), "Parallel")))
        })
        .collect();

    for handle in handles {
        handle.join().expect("Worker panicked").expect("Failed to add student");
    }

    assert_eq!(manager.list_all().unwrap().len(), 8);
    assert_eq!(manager.factory().stats().sessions_open, 0);
}

#[test]
fn test_update_intoTakenUniqueValue_shouldFailWithConstraintViolation() {
    let (students, enrollments) = create_enrollment_managers();
    let ada = students.add(&mut student("M-700", "Ada")).unwrap();
    let mut front = enrollment(ada, "A-1");
    let mut back = enrollment(ada, "B-7");
    enrollments.add(&mut front).unwrap();
    let back_id = enrollments.add(&mut back).unwrap();
    let rollbacks_before = enrollments.factory().stats().rollbacks;

    back.seat = Some("A-1".to_string());
    match enrollments.update(&back) {
        Err(UpdateError::ConstraintViolation(failure)) => {
            assert_eq!(failure.entity.id, Some(back_id));
            assert!(matches!(failure.cause, StoreError::ConstraintViolation(_)));
        }
        other => panic!("Expected constraint violation, got {:?}", other),
    }

    assert_eq!(enrollments.get(&back_id).unwrap().seat.as_deref(), Some("B-7"));
    let stats = enrollments.factory().stats();
    assert_eq!(stats.rollbacks, rollbacks_before + 1);
    assert_eq!(stats.sessions_open, 0);
}

#[test]
fn test_add_withDanglingDeferredReference_shouldFailAtCommitWithConstraintViolation() {
    let (_, enrollments) = create_enrollment_managers();
    let mut orphan = enrollment(StudentId(77), "C-3");

    match enrollments.add(&mut orphan) {
        Err(AddError::ConstraintViolation(failure)) => {
            assert_eq!(failure.entity.seat.as_deref(), Some("C-3"));
            assert!(matches!(failure.cause, StoreError::ConstraintViolation(_)));
        }
        other => panic!("Expected constraint violation, got {:?}", other),
    }

    assert!(orphan.id.is_none());
    assert!(enrollments.list_all().unwrap().is_empty());
    let stats = enrollments.factory().stats();
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.sessions_open, 0);
}

#[test]
fn test_update_toDanglingDeferredReference_shouldFailAtCommitAndKeepRow() {
    let (students, enrollments) = create_enrollment_managers();
    let ada = students.add(&mut student("M-701", "Ada")).unwrap();
    let mut seat = enrollment(ada, "D-4");
    let id = enrollments.add(&mut seat).unwrap();

    seat.student_id = Some(StudentId(404));
    assert!(matches!(
        enrollments.update(&seat),
        Err(UpdateError::ConstraintViolation(_))
    ));

    assert_eq!(enrollments.get(&id).unwrap().student_id, Some(ada));
    assert_eq!(enrollments.factory().stats().sessions_open, 0);
}
