/*!
 * Async manager operations on the blocking pool
 */

use modelstore::{AddError, GetError, UpdateError};

use crate::common::{StudentId, create_student_manager, student};

#[tokio::test]
async fn test_asyncRoundTrip_shouldBehaveLikeSyncOperations() {
    let manager = create_student_manager();

    let (added, id) = manager
        .add_async(student("M-400", "Async Ada"))
        .await
        .expect("Failed to add student");
    assert_eq!(added.id, Some(id));
    assert!(added.enrolled_at.is_some());

    let mut fetched = manager.get_async(id).await.unwrap();
    fetched.name = Some("Renamed".to_string());
    manager.update_async(fetched.clone()).await.unwrap();
    assert_eq!(manager.get(&id).unwrap().name.as_deref(), Some("Renamed"));

    manager.delete_async(fetched).await.unwrap();
    assert!(manager.list_all_async().await.unwrap().is_empty());
    assert_eq!(manager.factory().stats().sessions_open, 0);
}

#[tokio::test]
async fn test_asyncFailures_shouldKeepTheirTypes() {
    let manager = create_student_manager();
    manager.add_async(student("M-401", "First")).await.unwrap();

    let duplicate = manager.add_async(student("M-401", "Second")).await;
    assert!(matches!(duplicate, Err(AddError::ConstraintViolation(_))));

    let missing = manager.get_async(StudentId(77)).await;
    assert!(matches!(missing, Err(GetError::NotFound(_))));

    let never_added = manager.update_async(student("M-402", "Blank")).await;
    assert!(matches!(never_added, Err(UpdateError::NotAdded(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_asyncAdds_fromManyTasks_shouldAllPersist() {
    let manager = create_student_manager();

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .add_async(student(&format!("M-5{:02}", i), "Concurrent"))
                    .await
                    .map(|(_, id)| id)
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.sort_by_key(|id| id.0);
    ids.dedup();

    assert_eq!(ids.len(), 10);
    assert_eq!(manager.list_all().unwrap().len(), 10);
}
