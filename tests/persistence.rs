//! File-backed database tests: data survives a reopen and migrations are
//! safe to run repeatedly.

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use taskpilot::config::DatabaseConfig;
use taskpilot::db::connect_from_config;
use taskpilot::history::{MessageRole, Store, TaskFilter};

fn file_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("taskpilot.db").display().to_string(),
    }
}

#[tokio::test]
async fn tasks_and_conversations_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    let task_id;
    let conversation_id;
    {
        let store = Store::new(connect_from_config(&config).await.unwrap());
        let task = store
            .create_task("alice", "persisted task".to_string(), None)
            .await
            .unwrap();
        task_id = task.id;

        let conversation = store
            .create_conversation("alice", Some("a chat".to_string()))
            .await
            .unwrap();
        conversation_id = conversation.id;
        store
            .append_message(conversation_id, MessageRole::User, "hello")
            .await
            .unwrap();
    }

    // Second open runs migrations again and sees the same rows.
    let store = Store::new(connect_from_config(&config).await.unwrap());

    let task = store.get_task(task_id, "alice").await.unwrap().unwrap();
    assert_eq!(task.title, "persisted task");
    assert!(!task.completed);

    let tasks = store.list_tasks("alice", TaskFilter::All).await.unwrap();
    assert_eq!(tasks.len(), 1);

    let messages = store.list_messages(conversation_id, 10).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
}

#[tokio::test]
async fn deleting_a_conversation_removes_its_messages_on_disk() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);

    let store = Store::new(connect_from_config(&config).await.unwrap());
    let conversation = store.create_conversation("alice", None).await.unwrap();
    store
        .append_message(conversation.id, MessageRole::User, "one")
        .await
        .unwrap();
    store
        .append_message(conversation.id, MessageRole::Assistant, "two")
        .await
        .unwrap();

    assert!(store.delete_conversation(conversation.id, "alice").await.unwrap());

    let messages = store.list_messages(conversation.id, 10).await.unwrap();
    assert!(messages.is_empty());
}
