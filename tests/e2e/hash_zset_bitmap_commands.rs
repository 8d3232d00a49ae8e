use crate::common;

#[tokio::test]
async fn test_hset_hget_hdel() {
    let (_server, mut conn) = common::setup().await;

    let added: i64 = redis::cmd("HSET")
        .arg("myhash")
        .arg("field1")
        .arg("value1")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(added, 1);

    let value: String = redis::cmd("HGET").arg("myhash").arg("field1").query_async(&mut conn).await.unwrap();
    assert_eq!(value, "value1");

    let removed: i64 = redis::cmd("HDEL").arg("myhash").arg("field1").query_async(&mut conn).await.unwrap();
    assert_eq!(removed, 1);

    let len: i64 = redis::cmd("HLEN").arg("myhash").query_async(&mut conn).await.unwrap();
    assert_eq!(len, 0);
}

#[tokio::test]
async fn test_zadd_zscore_zincrby() {
    let (_server, mut conn) = common::setup().await;

    let added: i64 = redis::cmd("ZADD")
        .arg("myzset")
        .arg("1")
        .arg("one")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(added, 1);

    let score: String = redis::cmd("ZSCORE").arg("myzset").arg("one").query_async(&mut conn).await.unwrap();
    assert_eq!(score, "1");

    let new_score: String = redis::cmd("ZINCRBY")
        .arg("myzset")
        .arg("2.5")
        .arg("one")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(new_score, "3.5");

    let card: i64 = redis::cmd("ZCARD").arg("myzset").query_async(&mut conn).await.unwrap();
    assert_eq!(card, 1);
}

#[tokio::test]
async fn test_bsetbit_bget_bcount() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("BSETBIT").arg("mybits").arg(7).arg(1).query_async(&mut conn).await.unwrap();
    let _: i64 = redis::cmd("BSETBIT").arg("mybits").arg(0).arg(1).query_async(&mut conn).await.unwrap();

    let bytes: Vec<u8> = redis::cmd("BGET").arg("mybits").query_async(&mut conn).await.unwrap();
    assert_eq!(bytes, vec![0b1000_0001]);

    let count: i64 = redis::cmd("BCOUNT").arg("mybits").query_async(&mut conn).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_bopt_and_across_two_keys() {
    let (_server, mut conn) = common::setup().await;

    let _: i64 = redis::cmd("BMSETBIT")
        .arg("a")
        .arg(0)
        .arg(1)
        .arg(1)
        .arg(1)
        .query_async(&mut conn)
        .await
        .unwrap();
    let _: i64 = redis::cmd("BMSETBIT")
        .arg("b")
        .arg(0)
        .arg(1)
        .arg(1)
        .arg(0)
        .query_async(&mut conn)
        .await
        .unwrap();

    let _: i64 = redis::cmd("BOPT")
        .arg("AND")
        .arg("dest")
        .arg("a")
        .arg("b")
        .query_async(&mut conn)
        .await
        .unwrap();

    let bytes: Vec<u8> = redis::cmd("BGET").arg("dest").query_async(&mut conn).await.unwrap();
    assert_eq!(bytes, vec![0b1000_0000]);
}
