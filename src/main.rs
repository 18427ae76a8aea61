use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use aquapod::config::BotConfig;
use aquapod::music::audio_sources::youtube::{YtDlpProvider, YtDlpSearch};
use aquapod::music::audio_sources::{CatalogSearchProvider, TrackResolver};
use aquapod::music::discord_channel::DiscordChannel;
use aquapod::music::event_handlers;
use aquapod::music::permissions::RolePermissionCheck;
use aquapod::music::queue_manager::GuildQueueStore;
use aquapod::music::songbird_sink::SongbirdSink;
use aquapod::music::{ControllerHandle, PlaybackController};

mod commands;
mod events;

use commands::music::{
    clear_queue::*, pause::*, play::*, refresh::*, resume::*, set_channel::*, skip::*, stop::*,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;
type CommandResult = Result<(), Error>;

/// Shared by every command invocation.
pub struct Data {
    pub controller: ControllerHandle,
    pub permissions: RolePermissionCheck,
}

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

fn search_provider(
    config: &BotConfig,
    http_client: &reqwest::Client,
) -> Option<Arc<dyn CatalogSearchProvider>> {
    if !config.search_enabled {
        info!("Search disabled, only links will be accepted");
        return None;
    }

    let streams: Arc<dyn CatalogSearchProvider> =
        Arc::new(YtDlpSearch::new(YtDlpProvider::new(config.ytdlp_path.clone())));

    // Handle podcast search feature
    #[cfg(feature = "podcast_search")]
    {
        use aquapod::music::audio_sources::spotify::{SpotifyCredentials, SpotifyPodcastSearch};

        if let Some(spotify) = &config.spotify {
            info!("Podcast search enabled through Spotify");
            let credentials = SpotifyCredentials {
                client_id: spotify.client_id.clone(),
                client_secret: spotify.client_secret.clone(),
            };
            return Some(Arc::new(SpotifyPodcastSearch::new(
                http_client.clone(),
                credentials,
                streams,
            )));
        }
    }

    #[cfg(not(feature = "podcast_search"))]
    let _ = http_client;

    Some(streams)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("aquapod=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = BotConfig::from_env()?;
    let http_client = reqwest::Client::new();

    let resolver = Arc::new(TrackResolver::new(
        Arc::new(YtDlpProvider::new(config.ytdlp_path.clone())),
        search_provider(&config, &http_client),
        config.resolver.clone(),
    ));

    let (controller, events) = event_handlers::channel();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let commands = vec![
        // Default commands
        register(),
        help(),
        // Music commands
        play(),
        pause(),
        resume(),
        skip(),
        stop(),
        clear_queue(),
        refresh(),
        set_channel(),
    ];

    let permissions = RolePermissionCheck::new(config.dj_role_name.clone());
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup({
            let controller = controller.clone();
            let permissions = permissions.clone();
            move |ctx, ready, framework| {
                Box::pin(async move {
                    info!("{} is connected", ready.user.name);
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    Ok(Data {
                        controller,
                        permissions,
                    })
                })
            }
        });

    let songbird = songbird::Songbird::serenity();
    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework.build())
        .event_handler(events::Handler::new(controller.clone(), permissions))
        .register_songbird_with(songbird.clone())
        .await?;

    let sink = SongbirdSink::new(
        songbird,
        http_client,
        config.ytdlp_path.clone(),
        controller.clone(),
    );
    let playback = PlaybackController::new(
        GuildQueueStore::with_default_channel(config.assigned_channel),
        Arc::new(sink),
        Arc::new(DiscordChannel::new(client.http.clone())),
        resolver,
        controller.clone(),
    );
    let controller_task = tokio::spawn(playback.run(events));

    let shard_manager = client.shard_manager.clone();
    let stopper = controller.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Shutting down");
        stopper.shutdown();
        shard_manager.shutdown_all().await;
    });

    let result = client.start().await.map_err(Into::into);
    controller.shutdown();
    if let Err(e) = controller_task.await {
        error!("Playback controller task failed: {}", e);
    }
    result
}
