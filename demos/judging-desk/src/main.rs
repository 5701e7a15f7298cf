//! Example judging desk driving the client against an in-process server.
//!
//! Run with: cargo run -p judging-desk-demo
//!
//! The "server" is a scripted task on the other end of the channel
//! transport: it answers requests, pushes a shared-state broadcast once
//! synchronization is enabled, and reports anything it does not support on
//! the protocol-error channel.

use anyhow::Result;
use judgewire_client::{Client, SocketEvent};
use judgewire_proto::{
    ClientEvent, Hack, HackDraft, Judge, ProtocolFault, Rating, Reply, ReplyOutcome, RequestToken,
    ServerEvent, SharedSnapshot,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (emit_tx, emit_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);
    tokio::spawn(expo_server(emit_rx, event_tx.clone()));

    let client = Client::spawn(emit_tx, event_rx);
    client
        .subscribe_status(|status| {
            tracing::info!(?status, "connection status");
            Ok(())
        })
        .forever();
    client
        .subscribe_shared(|snapshot| {
            tracing::info!(
                hacks = snapshot.hacks.len(),
                ratings = snapshot.ratings.len(),
                "shared state broadcast"
            );
            Ok(())
        })
        .forever();
    client
        .subscribe_protocol_errors(|fault| {
            tracing::warn!(origin = %fault.origin, "server fault: {}", fault.message);
            Ok(())
        })
        .forever();

    event_tx.send(SocketEvent::Connect).await?;

    let judge = client.login("judge-3-secret").await?.wait().await?;
    tracing::info!(judge = %judge.name, "logged in");

    let hack = client
        .add_hack(HackDraft {
            name: "Teleporting Toaster".into(),
            location: "Table 41".into(),
            description: "Toast, anywhere.".into(),
        })
        .await?
        .wait()
        .await?;
    tracing::info!(hack = %hack.name, id = hack.id, "hack registered");

    let rating = client
        .rate_hack(Rating {
            judge_id: judge.id,
            hack_id: hack.id,
            rating: 15,
        })
        .await?
        .wait()
        .await?;
    tracing::info!(score = rating.rating, "rating stored");

    // Enabling synchronization makes the server push a snapshot before it
    // acknowledges, so the broadcast above has printed by the time this
    // settles.
    client.set_synchronize_shared(true).await?.wait().await?;

    tracing::info!("judging desk done");
    Ok(())
}

/// Scripted stand-in for the judging server.
async fn expo_server(
    mut requests: mpsc::Receiver<ClientEvent>,
    events: mpsc::Sender<SocketEvent>,
) {
    let mut hacks: Vec<Hack> = Vec::new();
    let mut ratings: Vec<Rating> = Vec::new();
    let mut next_hack_id = 1;

    while let Some(request) = requests.recv().await {
        match request {
            ClientEvent::Login { seq, .. } => {
                let judge = Judge {
                    id: 3,
                    name: "Ada".into(),
                    email: "ada@example.com".into(),
                };
                deliver(&events, ServerEvent::LoginResponse(ok(seq, json!(judge)))).await;
            }
            ClientEvent::AddHack { seq, hack } => {
                let stored = Hack {
                    id: next_hack_id,
                    name: hack.name,
                    location: hack.location,
                    description: hack.description,
                };
                next_hack_id += 1;
                hacks.push(stored.clone());
                deliver(&events, ServerEvent::AddHackResponse(ok(seq, json!(stored)))).await;
            }
            ClientEvent::RateHack { seq, rating } => {
                ratings.push(rating.clone());
                deliver(
                    &events,
                    ServerEvent::RateHackResponse(ok(seq, json!(rating))),
                )
                .await;
            }
            ClientEvent::SetSynchronizeShared { seq, enabled } => {
                if enabled {
                    let snapshot = SharedSnapshot {
                        hacks: hacks.clone(),
                        ratings: ratings.clone(),
                        ..SharedSnapshot::default()
                    };
                    deliver(&events, ServerEvent::SynchronizeShared(snapshot)).await;
                }
                deliver(
                    &events,
                    ServerEvent::SetSynchronizeSharedResponse(ok(seq, json!(enabled))),
                )
                .await;
            }
            other => {
                deliver(
                    &events,
                    ServerEvent::ProtocolError(ProtocolFault {
                        origin: other.kind().to_string(),
                        message: "not supported by the demo server".into(),
                    }),
                )
                .await;
            }
        }
    }
}

fn ok(seq: RequestToken, data: Value) -> Reply {
    Reply {
        seq,
        outcome: ReplyOutcome::Success { data },
    }
}

async fn deliver(events: &mpsc::Sender<SocketEvent>, event: ServerEvent) {
    match serde_json::to_value(&event) {
        Ok(payload) => {
            if events.send(SocketEvent::Message(payload)).await.is_err() {
                tracing::error!("client went away");
            }
        }
        Err(e) => tracing::error!(event = event.kind(), "failed to serialize event: {e}"),
    }
}
