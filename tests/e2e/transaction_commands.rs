use crate::common;

#[tokio::test]
async fn test_commit_makes_writes_visible() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("BEGIN").query_async(&mut conn).await.unwrap();
    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await.unwrap();
    let _: String = redis::cmd("COMMIT").query_async(&mut conn).await.unwrap();

    let value: String = redis::cmd("GET").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "v");
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("BEGIN").query_async(&mut conn).await.unwrap();
    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await.unwrap();
    let _: String = redis::cmd("ROLLBACK").query_async(&mut conn).await.unwrap();

    let value: Option<String> = redis::cmd("GET").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_nested_begin_is_rejected() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("BEGIN").query_async(&mut conn).await.unwrap();
    let result: redis::RedisResult<String> = redis::cmd("BEGIN").query_async(&mut conn).await;
    assert!(result.is_err());

    let _: String = redis::cmd("ROLLBACK").query_async(&mut conn).await.unwrap();
}

#[tokio::test]
async fn test_deny_listed_command_rejected_in_transaction() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("BEGIN").query_async(&mut conn).await.unwrap();
    let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    assert!(result.is_err());

    let _: String = redis::cmd("ROLLBACK").query_async(&mut conn).await.unwrap();
}

#[tokio::test]
async fn test_writes_not_visible_to_other_connections_until_commit() {
    let server = common::TestServer::start().await;
    let mut writer = server.get_async_connection().await.unwrap();
    let mut reader = server.get_async_connection().await.unwrap();

    let _: String = redis::cmd("BEGIN").query_async(&mut writer).await.unwrap();
    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut writer).await.unwrap();

    let value: Option<String> = redis::cmd("GET").arg("k").query_async(&mut reader).await.unwrap();
    assert_eq!(value, None);

    let _: String = redis::cmd("COMMIT").query_async(&mut writer).await.unwrap();

    let value: String = redis::cmd("GET").arg("k").query_async(&mut reader).await.unwrap();
    assert_eq!(value, "v");
}
