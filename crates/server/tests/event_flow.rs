//! End-to-end flow over the newline-JSON transport: command in, listing batch
//! in, paced detail requests out, detail responses in, rewritten batch out.

use broker_filter::{PassiveCategory, PassiveIndex};
use broker_protocol::{
    DetailRequest, DetailResponse, Inbound, Listing, ListingBatch, Outbound, TOOLTIP_KIND,
};
use broker_proxyd::run_loop;
use broker_session::{FilterSession, PacedDispatcher, SessionConfig};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

struct Client {
    reader: tokio::io::Lines<BufReader<ReadHalf<tokio::io::DuplexStream>>>,
    writer: WriteHalf<tokio::io::DuplexStream>,
}

impl Client {
    async fn send(&mut self, inbound: &Inbound) {
        let raw = serde_json::to_string(inbound).unwrap();
        self.writer.write_all(raw.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Outbound {
        let line = tokio::time::timeout(Duration::from_secs(5), self.reader.next_line())
            .await
            .expect("timed out waiting for outbound event")
            .unwrap()
            .expect("transport closed");
        serde_json::from_str(&line).unwrap()
    }
}

fn start_server() -> (Client, tokio::task::JoinHandle<()>) {
    let index = Arc::new(PassiveIndex::from_members([(
        PassiveCategory(1001),
        vec![101, 202],
    )]));

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let paced_tx = PacedDispatcher::spawn(Duration::from_millis(5), outbound_tx.clone());
    let session = FilterSession::new(
        index,
        SessionConfig {
            owner: "Tester".into(),
            stale_after: None,
        },
        paced_tx,
        outbound_tx.clone(),
    );

    let (server_end, client_end) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_end);
    let (client_read, client_write) = tokio::io::split(client_end);

    let handle = tokio::spawn(async move {
        run_loop(
            BufReader::new(server_read),
            server_write,
            session,
            outbound_tx,
            outbound_rx,
        )
        .await
        .expect("run_loop failed");
    });

    (
        Client {
            reader: BufReader::new(client_read).lines(),
            writer: client_write,
        },
        handle,
    )
}

fn listing(listing_id: u64, item_id: u64) -> Listing {
    Listing {
        listing_id,
        item_id,
        payload: serde_json::Value::Null,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn filtered_batch_replaces_raw_listing_event() {
    let (mut client, _handle) = start_server();

    client
        .send(&Inbound::Command {
            line: "filter pamp 1".into(),
        })
        .await;
    assert_eq!(
        client.recv().await,
        Outbound::Message {
            text: "Filtering broker offers for 1 (pamp) line.".into()
        }
    );

    client
        .send(&Inbound::ListingBatch(ListingBatch {
            listings: vec![listing(1, 1000), listing(2, 2000)],
        }))
        .await;

    // The raw batch is suppressed; the next outbound events are the paced
    // detail requests.
    let mut requests: Vec<DetailRequest> = Vec::new();
    for _ in 0..2 {
        match client.recv().await {
            Outbound::DetailRequest(req) => requests.push(req),
            other => panic!("expected detail request, got {other:?}"),
        }
    }
    assert_eq!(
        requests.iter().map(|r| r.item_id).collect::<Vec<_>>(),
        vec![1000, 2000]
    );
    assert!(requests.iter().all(|r| r.owner == "Tester"));
    let generation = requests[0].generation;

    // Answer out of order; only item 1000 carries a matching roll.
    client
        .send(&Inbound::DetailResponse(DetailResponse {
            kind: TOOLTIP_KIND,
            generation,
            item_id: 2000,
            passivities: vec![999],
        }))
        .await;
    client
        .send(&Inbound::DetailResponse(DetailResponse {
            kind: TOOLTIP_KIND,
            generation,
            item_id: 1000,
            passivities: vec![101],
        }))
        .await;

    assert_eq!(
        client.recv().await,
        Outbound::ListingBatch(ListingBatch {
            listings: vec![listing(1, 1000)]
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_filter_passes_listing_through() {
    let (mut client, _handle) = start_server();

    let batch = ListingBatch {
        listings: vec![listing(7, 70)],
    };
    client.send(&Inbound::ListingBatch(batch.clone())).await;
    assert_eq!(client.recv().await, Outbound::ListingBatch(batch));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn garbage_lines_do_not_kill_the_loop() {
    let (mut client, _handle) = start_server();

    client.writer.write_all(b"{not json}\n\n").await.unwrap();
    client
        .send(&Inbound::Command {
            line: "filter off".into(),
        })
        .await;
    assert_eq!(
        client.recv().await,
        Outbound::Message {
            text: "Broker filter turned off.".into()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unrelated_detail_responses_are_ignored() {
    let (mut client, _handle) = start_server();

    client
        .send(&Inbound::Command {
            line: "filter pamp".into(),
        })
        .await;
    client.recv().await;

    // No cycle is active; a stray tooltip answer must produce nothing.
    client
        .send(&Inbound::DetailResponse(DetailResponse {
            kind: TOOLTIP_KIND,
            generation: 1,
            item_id: 1,
            passivities: vec![101],
        }))
        .await;

    // Prove the loop is still alive and the stray response changed nothing.
    let batch = ListingBatch {
        listings: vec![listing(3, 30)],
    };
    client
        .send(&Inbound::Command {
            line: "filter off".into(),
        })
        .await;
    client.recv().await;
    client.send(&Inbound::ListingBatch(batch.clone())).await;
    assert_eq!(client.recv().await, Outbound::ListingBatch(batch));
}
