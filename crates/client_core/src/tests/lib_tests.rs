use super::*;
use crate::test_support::{drain, item, FakeBackend};

fn client() -> (Arc<FakeBackend>, PicsortClient) {
    let backend = Arc::new(
        FakeBackend::new()
            .with_root(&["photos"])
            .with_children("photos/", &[])
            .with_items("photos/", &["a.jpg", "b.jpg"]),
    );
    (backend.clone(), PicsortClient::new(backend))
}

#[tokio::test]
async fn open_current_folder_reviews_the_browsed_directory() {
    let (_, client) = client();
    client.navigation.descend("photos/").await.expect("descend");

    let loaded = client.open_current_folder().await.expect("open");
    assert_eq!(loaded, Loaded::Ready { count: 2 });
    let snapshot = client.review.snapshot().await;
    assert_eq!(snapshot.source_path.as_deref(), Some("photos/"));
    assert_eq!(snapshot.current_item(), Some(&item("photos/", "a.jpg")));
}

#[tokio::test]
async fn upload_reloads_the_review_session_on_its_destination() {
    let (backend, client) = client();
    let mut rx = client.subscribe();
    client.navigation.descend("photos/").await.expect("descend");
    client
        .upload
        .select_files(vec![PendingFile::new("c.jpg", vec![0; 8])])
        .await;

    let receipt = client.upload_to_current_folder().await.expect("upload");
    assert_eq!(receipt.destination, "photos/");
    assert_eq!(backend.uploads().len(), 1);

    let snapshot = client.review.snapshot().await;
    assert_eq!(snapshot.source_path.as_deref(), Some("photos/"));
    assert_eq!(snapshot.items.len(), 2);

    let notices = drain(&mut rx);
    assert!(notices
        .iter()
        .any(|notice| notice.level == NoticeLevel::Success && notice.context == NoticeContext::Upload));
}

#[tokio::test]
async fn components_share_one_notification_stream() {
    let (_, client) = client();
    let mut rx = client.subscribe();

    client.review.commit().await.expect_err("nothing loaded");
    client.navigation.create_folder("").await.expect_err("blank name");

    let contexts: Vec<NoticeContext> = drain(&mut rx).iter().map(|notice| notice.context).collect();
    assert_eq!(
        contexts,
        vec![NoticeContext::Commit, NoticeContext::CreateFolder]
    );
}
