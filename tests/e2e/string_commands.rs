use crate::common;

#[tokio::test]
async fn test_set_and_get() {
    let (_server, mut conn) = common::setup().await;

    let _: () = redis::cmd("SET")
        .arg("mykey")
        .arg("Hello")
        .query_async(&mut conn)
        .await
        .unwrap();

    let value: String = redis::cmd("GET").arg("mykey").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "Hello");
}

#[tokio::test]
async fn test_get_missing_key_returns_nil() {
    let (_server, mut conn) = common::setup().await;

    let value: Option<String> = redis::cmd("GET").arg("nosuchkey").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_del_counts_only_existing_keys() {
    let (_server, mut conn) = common::setup().await;

    let _: () = redis::cmd("SET").arg("a").arg("1").query_async(&mut conn).await.unwrap();
    let n: i64 = redis::cmd("DEL").arg("a").arg("b").query_async(&mut conn).await.unwrap();
    assert_eq!(n, 1);

    let value: Option<String> = redis::cmd("GET").arg("a").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_binary_safety() {
    let (_server, mut conn) = common::setup().await;

    let binary_data = vec![0u8, 1, 2, 3, 255, 254, 253];
    let _: () = redis::cmd("SET")
        .arg("binkey")
        .arg(&binary_data)
        .query_async(&mut conn)
        .await
        .unwrap();

    let result: Vec<u8> = redis::cmd("GET").arg("binkey").query_async(&mut conn).await.unwrap();
    assert_eq!(result, binary_data);
}

#[tokio::test]
async fn test_set_overwrites_existing_value() {
    let (_server, mut conn) = common::setup().await;

    let _: () = redis::cmd("SET").arg("k").arg("first").query_async(&mut conn).await.unwrap();
    let _: () = redis::cmd("SET").arg("k").arg("second").query_async(&mut conn).await.unwrap();

    let value: String = redis::cmd("GET").arg("k").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "second");
}
