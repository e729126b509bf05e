use microcrm::db::{NewUser, Store, TokenStoreError};

async fn memory_store() -> Store {
    Store::new("sqlite::memory:")
        .await
        .expect("Failed to open in-memory store")
}

#[tokio::test]
async fn test_id_token_roundtrip_and_replace() {
    let store = memory_store().await;

    store.put_id_token(1, "first", 3600).await.unwrap();
    assert_eq!(store.get_id_token(1).await.unwrap(), "first");

    // A second put replaces the first
    store.put_id_token(1, "second", 3600).await.unwrap();
    assert_eq!(store.get_id_token(1).await.unwrap(), "second");

    store.delete_id_token(1).await.unwrap();
    assert!(matches!(
        store.get_id_token(1).await,
        Err(TokenStoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_id_token_concurrent_puts_resolve_last_write_wins() {
    let store = memory_store().await;

    // Racing writers for the same user must both succeed; the surviving
    // row is whichever write landed last, never a constraint error.
    let (a, b) = tokio::join!(
        store.put_id_token(1, "writer-a", 3600),
        store.put_id_token(1, "writer-b", 3600),
    );
    a.unwrap();
    b.unwrap();

    let token = store.get_id_token(1).await.unwrap();
    assert!(token == "writer-a" || token == "writer-b");
}

#[tokio::test]
async fn test_id_token_rejects_non_positive_ttl() {
    let store = memory_store().await;

    assert!(matches!(
        store.put_id_token(1, "tok", 0).await,
        Err(TokenStoreError::InvalidExpiry)
    ));
    assert!(matches!(
        store.put_id_token(1, "tok", -5).await,
        Err(TokenStoreError::InvalidExpiry)
    ));
}

#[tokio::test]
async fn test_id_token_expiry() {
    let store = memory_store().await;

    store.put_id_token(1, "short-lived", 1).await.unwrap();
    store.put_id_token(2, "long-lived", 3600).await.unwrap();
    assert_eq!(store.get_id_token(1).await.unwrap(), "short-lived");

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

    // Expired rows read as absent...
    assert!(matches!(
        store.get_id_token(1).await,
        Err(TokenStoreError::NotFound)
    ));

    // ...and the sweep only touches expired rows
    store.put_id_token(3, "also-short", 1).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    let purged = store.id_token_repo().purge_expired().await.unwrap();
    assert_eq!(purged, 1);
    assert_eq!(store.get_id_token(2).await.unwrap(), "long-lived");
}

#[tokio::test]
async fn test_id_token_missing_user() {
    let store = memory_store().await;

    assert!(matches!(
        store.get_id_token(999).await,
        Err(TokenStoreError::NotFound)
    ));

    // Deleting an absent token is not an error
    store.delete_id_token(999).await.unwrap();
}

#[tokio::test]
async fn test_find_or_create_by_email() {
    let store = memory_store().await;

    let (user, created) = store
        .find_or_create_user_by_email("ada@example.com", "Ada", "Lovelace")
        .await
        .unwrap();
    assert!(created);
    assert_eq!(user.username, "ada");
    assert_eq!(user.role, "employee");
    assert_eq!(user.status, "active");

    // Second call finds the same account
    let (again, created) = store
        .find_or_create_user_by_email("ada@example.com", "Ada", "Lovelace")
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, user.id);
}

#[tokio::test]
async fn test_find_or_create_does_not_clobber_existing_account() {
    let store = memory_store().await;

    let existing = store
        .create_user(NewUser {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "some-hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: "admin".to_string(),
            status: "active".to_string(),
        })
        .await
        .unwrap();

    let (found, created) = store
        .find_or_create_user_by_email("ada@example.com", "Someone", "Else")
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(found.id, existing.id);
    assert_eq!(found.role, "admin");
    assert_eq!(found.first_name, "Ada");
}

#[tokio::test]
async fn test_ownership_validation() {
    use microcrm::db::{ContactInput, OwnedTable, OwnershipError};

    let store = memory_store().await;

    let (ada, _) = store
        .find_or_create_user_by_email("ada@example.com", "Ada", "Lovelace")
        .await
        .unwrap();
    let (bob, _) = store
        .find_or_create_user_by_email("bob@example.com", "Bob", "Tables")
        .await
        .unwrap();

    let contact = store
        .create_contact(
            ada.id,
            ContactInput {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                company_id: None,
                email: None,
                phone_number: None,
                job_title: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    store
        .validate_ownership(OwnedTable::Contacts, contact.id, ada.id)
        .await
        .unwrap();

    assert!(matches!(
        store
            .validate_ownership(OwnedTable::Contacts, contact.id, bob.id)
            .await,
        Err(OwnershipError::NotOwned)
    ));

    // Nonexistent rows look identical to rows owned by someone else
    assert!(matches!(
        store
            .validate_ownership(OwnedTable::Companies, 12345, ada.id)
            .await,
        Err(OwnershipError::NotOwned)
    ));
}
