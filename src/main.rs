use convsrv_launcher::config::LauncherConfig;
use convsrv_launcher::launcher::{self, error::LauncherError, Launcher};
use convsrv_launcher::python_env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Enhanced PDF Converter launcher starting");

    let config = LauncherConfig::load();
    let pause = config.pause_on_exit;
    let launcher = Launcher::new(config.clone());

    let result = launcher.run().await;

    if let Err(e) = &result {
        tracing::error!("{}", e);
        if matches!(e, LauncherError::NoInterpreter { .. }) {
            // Resolution failed — dump what was probed so the user can see
            // which conventional locations are empty on this machine.
            let root = launcher
                .resolve_root()
                .unwrap_or_else(|_| std::env::current_dir().unwrap_or_default());
            let report = python_env::status(&root, &config.venv_dir).await;
            eprintln!("Interpreter diagnostics:");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            eprintln!("Install Python 3 or create a venv next to {}.", config.entry_point);
        }
    }

    // Interactive variant keeps the console open even after a failure, so
    // double-click users can read the message before the window closes.
    if pause {
        launcher::wait_for_ack();
    }

    result.map_err(Into::into)
}
