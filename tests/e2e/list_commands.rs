use crate::common;

#[tokio::test]
async fn test_lpush_llen() {
    let (_server, mut conn) = common::setup().await;

    let len: i64 = redis::cmd("LPUSH").arg("mylist").arg("World").query_async(&mut conn).await.unwrap();
    assert_eq!(len, 1);

    let len: i64 = redis::cmd("LPUSH").arg("mylist").arg("Hello").query_async(&mut conn).await.unwrap();
    assert_eq!(len, 2);

    let len: i64 = redis::cmd("LLEN").arg("mylist").query_async(&mut conn).await.unwrap();
    assert_eq!(len, 2);
}

#[tokio::test]
async fn test_rpush_lrange() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("RPUSH")
        .arg("mylist")
        .arg("Hello")
        .arg("World")
        .query_async(&mut conn)
        .await
        .unwrap();

    let values: Vec<String> = redis::cmd("LRANGE").arg("mylist").arg(0).arg(-1).query_async(&mut conn).await.unwrap();
    assert_eq!(values, vec!["Hello", "World"]);
}

#[tokio::test]
async fn test_lpop_rpop() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("RPUSH")
        .arg("mylist")
        .arg("one")
        .arg("two")
        .arg("three")
        .query_async(&mut conn)
        .await
        .unwrap();

    let value: String = redis::cmd("LPOP").arg("mylist").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "one");

    let value: String = redis::cmd("RPOP").arg("mylist").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "three");

    let values: Vec<String> = redis::cmd("LRANGE").arg("mylist").arg(0).arg(-1).query_async(&mut conn).await.unwrap();
    assert_eq!(values, vec!["two"]);
}

#[tokio::test]
async fn test_lrange_negative_indices() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("RPUSH")
        .arg("mylist")
        .arg("a")
        .arg("b")
        .arg("c")
        .arg("d")
        .query_async(&mut conn)
        .await
        .unwrap();

    let values: Vec<String> = redis::cmd("LRANGE").arg("mylist").arg(-2).arg(-1).query_async(&mut conn).await.unwrap();
    assert_eq!(values, vec!["c", "d"]);
}

#[tokio::test]
async fn test_pop_on_missing_key_returns_nil() {
    let (_server, mut conn) = common::setup().await;

    let value: Option<String> = redis::cmd("LPOP").arg("nosuchlist").query_async(&mut conn).await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_popping_last_element_drops_the_key() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("RPUSH").arg("mylist").arg("only").query_async(&mut conn).await.unwrap();
    let _: String = redis::cmd("RPOP").arg("mylist").query_async(&mut conn).await.unwrap();

    let len: i64 = redis::cmd("LLEN").arg("mylist").query_async(&mut conn).await.unwrap();
    assert_eq!(len, 0);
}
