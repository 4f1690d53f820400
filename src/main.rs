// ============================================================================
// Kursboard - Tableau des cours et calculateur de change
// ============================================================================
// Programme TUI : tableau achat/vente par devise + calculateur de conversion.
// Les cours viennent d'une chaîne de sources (flux temps réel, API des cours
// du jour, données statiques) exécutée par un worker en arrière-plan.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements et rendering
// 3. Async dans sync : runtime tokio dans un thread worker
// 4. Arc<RateStore> : le worker remplace la liste, l'UI lit des snapshots
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use kursboard::api::{LoadedRates, SourceChain};
use kursboard::app::App;
use kursboard::config::SourceConfig;
use kursboard::store::RateStore;
use kursboard::ui::{events::EventHandler, render};

// ============================================================================
// AppCommand : commandes du worker thread
// ============================================================================
// Le worker ne renvoie rien par channel : il remplace la liste dans le
// RateStore, et l'UI observe le dépôt via son abonnement watch.
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Parcourt la chaîne de sources et remplace la liste active
    LoadRates,
}

/// Verrouille l'App même si un thread a paniqué en la tenant
fn lock_app(app: &Mutex<App>) -> MutexGuard<'_, App> {
    app.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier avec rotation quotidienne.
// ============================================================================

/// Répertoire des logs
///
/// - Linux : ~/.local/share/kursboard/logs
/// - macOS : ~/Library/Application Support/kursboard/logs
/// - Windows : C:\Users\<user>\AppData\Local\kursboard\logs
/// - sinon : ./logs
fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("kursboard").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// tail -f ~/.local/share/kursboard/logs/kursboard.log.*
/// RUST_LOG=kursboard=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Échec de la création du répertoire de logs {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "kursboard.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour kursboard, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kursboard=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'installation du subscriber tracing")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {:#}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("Kursboard starting up");

    let config = SourceConfig::from_env();
    info!(?config, "Source configuration loaded");
    let chain = SourceChain::from_config(&config);

    let store = Arc::new(RateStore::new());
    let app = Arc::new(Mutex::new(App::with_rates(store.snapshot())));

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let rates_rx = store.subscribe();

    info!("Spawning background worker thread");
    spawn_background_worker(chain, store, command_rx, app.clone());

    // Premier chargement dès le démarrage ; le TUI affiche l'indicateur
    command_tx
        .send(AppCommand::LoadRates)
        .context("Le worker n'accepte pas de commandes")?;

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, app, rates_rx, &events, command_tx);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// - Thread séparé avec son propre runtime tokio
// - Reçoit des AppCommand, remplace la liste dans le dépôt
// ============================================================================

fn spawn_background_worker(
    chain: SourceChain,
    store: Arc<RateStore>,
    command_rx: mpsc::Receiver<AppCommand>,
    app: Arc<Mutex<App>>,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = ?e, "Failed to create tokio runtime, worker stopped");
                return;
            }
        };

        while let Ok(command) = command_rx.recv() {
            info!(?command, "Worker received command");

            match command {
                AppCommand::LoadRates => {
                    lock_app(&app).start_loading(Some("Загрузка курсов...".to_string()));

                    // block_on bloque le worker, pas l'UI
                    let loaded = runtime.block_on(chain.load_currencies());
                    store.replace(loaded);

                    lock_app(&app).stop_loading();
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Dépôt : applique la nouvelle liste si le worker l'a remplacée
//   1. Render
//   2. Input
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: Arc<Mutex<App>>,
    mut rates_rx: watch::Receiver<Arc<LoadedRates>>,
    events: &EventHandler,
    command_tx: mpsc::Sender<AppCommand>,
) -> Result<()> {
    loop {
        if !lock_app(&app).is_running() {
            break;
        }

        // CONCEPT : watch::Receiver::has_changed est non bloquant
        // - Ok(true) : nouvelle liste depuis la dernière lecture
        // - Err : le dépôt a disparu (worker terminé)
        match rates_rx.has_changed() {
            Ok(true) => {
                let rates = rates_rx.borrow_and_update().clone();
                info!(
                    origin = ?rates.origin,
                    currencies = rates.list.len(),
                    "Rates replaced, refreshing board"
                );
                lock_app(&app).apply_rates(rates);
            }
            Ok(false) => {}
            Err(_) => warn!("Rate store dropped, board will not refresh"),
        }

        terminal.draw(|frame| {
            let app_lock = lock_app(&app);
            render(frame, &app_lock);
        })?;

        match events.next() {
            Ok(event) => {
                let mut app_lock = lock_app(&app);
                handle_event(&mut app_lock, event, &command_tx);
            }
            Err(e) => debug!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et met à jour l'état de l'application
///
/// Les guards filtrent selon l'écran : en saisie du montant, seules les
/// touches de saisie sont actives.
fn handle_event(app: &mut App, event: kursboard::ui::events::Event, command_tx: &mpsc::Sender<AppCommand>) {
    use kursboard::ui::events::{
        get_char_from_event, is_amount_char_event, is_amount_event, is_backspace_event,
        is_down_event, is_enter_event, is_escape_event, is_focus_event, is_next_currency_event,
        is_previous_currency_event, is_quit_event, is_reload_event, is_swap_event,
        is_theme_event, is_up_event, Event,
    };

    match event {
        Event::Tick => {}

        // ========================================
        // Saisie du montant
        // ========================================
        Event::Key(_) if app.is_in_amount_input() => {
            if is_enter_event(&event) {
                info!(amount = %app.calculator.amount_text, "User submitted amount");
                app.submit_amount();
            } else if is_escape_event(&event) {
                debug!("User cancelled amount input");
                app.cancel_amount_input();
            } else if is_backspace_event(&event) {
                app.amount_backspace();
            } else if is_amount_char_event(&event) {
                if let Some(c) = get_char_from_event(&event) {
                    app.push_amount_char(c);
                }
            }
        }

        // ========================================
        // Dashboard
        // ========================================
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        Event::Key(_) => {
            app.cancel_quit();

            if is_up_event(&event) {
                app.navigate_up();
            } else if is_down_event(&event) {
                app.navigate_down();
            } else if is_enter_event(&event) {
                app.use_selected_as_source();
                debug!(from = %app.calculator.from_code, "Selected card used as source currency");
            } else if is_amount_event(&event) {
                app.start_amount_input();
            } else if is_focus_event(&event) {
                app.toggle_focus();
            } else if is_next_currency_event(&event) {
                app.cycle_selection(true);
            } else if is_previous_currency_event(&event) {
                app.cycle_selection(false);
            } else if is_swap_event(&event) {
                app.swap_currencies();
            } else if is_theme_event(&event) {
                app.toggle_theme();
                debug!(theme = ?app.theme, "User toggled theme");
            } else if is_reload_event(&event) && !app.is_loading_data() {
                info!("User requested rates reload");
                app.start_loading(None);
                if command_tx.send(AppCommand::LoadRates).is_err() {
                    error!("Worker thread is gone, cannot reload rates");
                    app.stop_loading();
                }
            }
        }
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Impossible d'activer le raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Impossible de créer le terminal")
}

/// Restaure le terminal à son état normal, même après une erreur de run()
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
