use crate::common;
use std::time::Duration;

#[tokio::test]
async fn test_expire_then_ttl_then_get_after_expiry() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await.unwrap();
    let armed: i64 = redis::cmd("EXPIRE").arg("k").arg(1).query_async(&mut conn).await.unwrap();
    assert_eq!(armed, 1);

    let ttl: i64 = redis::cmd("TTL").arg("k").query_async(&mut conn).await.unwrap();
    assert!(ttl > 0 && ttl <= 1);

    // Expiration ticks once per second; wait past two cycles for the
    // background sweep to have caught this deadline.
    tokio::time::sleep(Duration::from_millis(2200)).await;

    let value: Option<String> = redis::cmd("GET").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_persist_clears_ttl() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await.unwrap();
    let _: i64 = redis::cmd("EXPIRE").arg("k").arg(100).query_async(&mut conn).await.unwrap();

    let cleared: i64 = redis::cmd("PERSIST").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(cleared, 1);

    let ttl: i64 = redis::cmd("TTL").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(ttl, -1);
}

#[tokio::test]
async fn test_negative_expire_deletes_immediately() {
    let (_server, mut conn) = common::setup().await;

    let _: String = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await.unwrap();
    let _: i64 = redis::cmd("EXPIRE").arg("k").arg(-5).query_async(&mut conn).await.unwrap();

    let value: Option<String> = redis::cmd("GET").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}
