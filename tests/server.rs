use std::path::Path;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

use queuekv::config::Config;
use queuekv::queue::SpoolQueue;
use queuekv::{client, server};

fn pending(root: &Path) -> usize {
    ["ready", "inflight"]
        .iter()
        .map(|dir| std::fs::read_dir(root.join(dir)).unwrap().count())
        .sum()
}

#[tokio::test]
async fn writes_read_results_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    let out = dir.path().join("out.txt");

    let queue = SpoolQueue::open(&spool).await.unwrap();
    let requests = [
        ("AddItem", "foo", "bar"),
        ("AddItem", "spam", "egg"),
        ("GetAllItems", "", ""),
        ("RemoveItem", "foo", ""),
        ("GetItem", "foo", ""),
        ("GetItem", "spam", ""),
    ];
    for (op, key, value) in requests {
        let op = client::request(op, key, value).unwrap();
        client::send(&queue, &op).await.unwrap();
    }

    let mut config = Config::new(&spool, &out);
    config.poll.receive.wait_time = Duration::from_millis(100);

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::run(config, async {
        let _ = stopped.await;
    }));

    while pending(&spool) > 0 {
        sleep(Duration::from_millis(20)).await;
    }
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "bar\negg\negg\n");
}

#[tokio::test]
async fn unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    let out = dir.path().join("missing").join("out.txt");

    let config = Config::new(&spool, &out);
    let result = server::run(config, std::future::pending()).await;

    assert!(result.is_err());
}
