use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use hypemeter::classify::classify;
use hypemeter::config::Config;
use hypemeter::engine::{reduce, Effect, MeterState};
use hypemeter::feed::eventsub;
use hypemeter::helix::{self, HelixSender, MessageSink};
use hypemeter::logging::{self, obj, v_str, Domain, Level};
use hypemeter::render::{project, FileSink, RenderSink};
use hypemeter::storage::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;

    let client = reqwest::Client::new();
    let ident = helix::validate_token(&client, &cfg.id_base, &cfg.token).await?;
    logging::log(
        Level::Info,
        Domain::System,
        "token_validated",
        obj(&[
            ("login", v_str(&ident.login)),
            ("expires_in", serde_json::json!(ident.expires_in)),
        ]),
    );

    let mut store = StateStore::open(&cfg.sqlite_path)?;
    store.init()?;
    let mut state = hydrate(&store);

    let sender: Arc<dyn MessageSink> = Arc::new(HelixSender::new(&cfg));
    let mut render_sink = FileSink::new(&cfg.render_path);
    render_sink.render(&project(&state));

    let (tx, mut rx) = mpsc::channel(cfg.feed_channel_capacity);
    tokio::spawn(eventsub::run(cfg.clone(), tx));

    // Strictly sequential: one notification is fully classified and
    // reduced before the next is taken off the channel, so MeterState
    // needs no locking. Chat sends are spawned and never awaited here —
    // a failed send must not roll back an applied mutation.
    while let Some(note) = rx.recv().await {
        for event in classify(&note, state.sub_detect, &cfg.bridge_login) {
            let out = reduce(&mut state, event);
            logging::log_transition(&format!("{:?}", event), out.state_hash, out.effects.len());

            for effect in out.effects {
                match effect {
                    Effect::Say(message) => {
                        let sink = Arc::clone(&sender);
                        tokio::spawn(async move {
                            if let Err(err) = sink.send(&message).await {
                                logging::log(
                                    Level::Error,
                                    Domain::Chat,
                                    "send_failed",
                                    obj(&[("error", v_str(&err.to_string()))]),
                                );
                            }
                        });
                    }

                    Effect::Persist => match store.save(&state) {
                        Ok(()) => logging::log_audit(out.state_hash),
                        Err(err) => logging::log(
                            Level::Error,
                            Domain::Storage,
                            "save_failed",
                            obj(&[("error", v_str(&err.to_string()))]),
                        ),
                    },

                    Effect::Render => render_sink.render(&project(&state)),

                    Effect::Reload => {
                        state = hydrate(&store);
                        render_sink.render(&project(&state));
                    }
                }
            }
        }
    }

    logging::log(Level::Info, Domain::System, "feed_ended", obj(&[]));
    Ok(())
}

/// Defaults merged under whatever the store holds; a broken record is
/// logged and mapped to defaults, never fatal.
fn hydrate(store: &StateStore) -> MeterState {
    match store.load() {
        Ok(Some(state)) => state,
        Ok(None) => MeterState::default(),
        Err(err) => {
            logging::log(
                Level::Error,
                Domain::Storage,
                "load_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            MeterState::default()
        }
    }
}
