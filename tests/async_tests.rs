use std::{future::Future, pin::pin, task::Poll, time::Duration};

use chrono::NaiveDate;
use lineage::{
    load_from_path_async, save_to_path, CodecError, DocumentFormat, JsonCodec, Person, Session,
    SessionOptions, SessionState,
};
use rust_decimal::Decimal;

fn people() -> Vec<Person> {
    let born = NaiveDate::from_ymd_opt(1969, 11, 23).unwrap();
    vec![
        Person::new("Bob", "Jones", born, Decimal::new(4000050, 2))
            .with_child(Person::new("Sally", "Jones", born, Decimal::ZERO)),
        Person::new("Alice", "Smith", born, Decimal::from(30000)),
    ]
}

/// Тест проверяет асинхронную загрузку JSON с разным сжатием.
#[tokio::test]
async fn test_load_json_async() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["people.json", "people.json.gz", "people.json.zst"] {
        let path = dir.path().join(name);
        let opts = SessionOptions::for_path(&path).unwrap();
        save_to_path(&people(), &path, opts.clone()).unwrap();

        let loaded = load_from_path_async(&path, opts).await.unwrap();
        assert_eq!(loaded, people(), "{name}");
    }
}

#[tokio::test]
async fn test_async_rejects_xml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.xml");

    let mut session = Session::new(SessionOptions::default());
    let err = session.decode_path_async(&path, None).await.unwrap_err();

    let codec = err.downcast_ref::<CodecError>().unwrap();
    assert!(codec.is_validation());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_async_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let opts = SessionOptions {
        format: DocumentFormat::Json,
        ..Default::default()
    };
    let err = load_from_path_async(dir.path().join("absent.json"), opts)
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<CodecError>().unwrap().is_io());
}

/// Тест проверяет, что асинхронный и синхронный декодеры дают одно и то же.
#[tokio::test]
async fn test_decode_async_matches_sync() {
    let codec = JsonCodec::new().pretty(true);
    let mut bytes = Vec::new();
    lineage::Codec::encode(&codec, &people(), &mut bytes).unwrap();

    let from_async = codec.decode_async(bytes.as_slice(), Some(2)).await.unwrap();
    let from_sync = codec.decode_slice(&bytes, Some(2)).unwrap();
    assert_eq!(from_async, from_sync);
    assert_eq!(from_async, people());
}

fn roster(n: usize) -> Vec<Person> {
    let born = NaiveDate::from_ymd_opt(1980, 5, 17).unwrap();
    (0..n)
        .map(|i| Person::new(format!("First{i}"), "Roster", born, Decimal::from(i as u64)))
        .collect()
}

/// Тест проверяет, что брошенная асинхронная загрузка ничего не отдаёт, не
/// доводит сессию до `Complete` и не портит файл.
#[tokio::test]
async fn test_dropped_async_decode_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let opts = SessionOptions::for_path(&path).unwrap();
    save_to_path(&roster(20_000), &path, opts.clone()).unwrap();

    let mut session = Session::new(opts.clone());
    {
        let mut load = pin!(session.decode_path_async(&path, None));
        let first = std::future::poll_fn(|cx| Poll::Ready(load.as_mut().poll(cx))).await;
        assert!(first.is_pending(), "file read must suspend on I/O");
    }
    assert_ne!(session.state(), SessionState::Complete);
    assert!(!session.state().is_terminal());

    let loaded = load_from_path_async(&path, opts).await.unwrap();
    assert_eq!(loaded.len(), 20_000);
}

/// Тест проверяет, что отмена по таймауту на медленном source не отдаёт
/// частичный результат.
#[tokio::test]
async fn test_timed_out_decode_returns_no_partial_people() {
    let mut bytes = Vec::new();
    lineage::Codec::encode(&JsonCodec::new(), &people(), &mut bytes).unwrap();

    let (mut writer, reader) = tokio::io::duplex(64);
    let half = bytes.len() / 2;
    let feed = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        writer.write_all(&bytes[..half]).await.unwrap();
        // writer остаётся открытым: source "завис" посреди документа
        tokio::time::sleep(Duration::from_secs(3600)).await;
        drop(writer);
    });

    let codec = JsonCodec::new();
    let outcome =
        tokio::time::timeout(Duration::from_millis(100), codec.decode_async(reader, None)).await;
    assert!(
        outcome.is_err(),
        "decode must still be waiting for the rest of the document"
    );
    feed.abort();
}
