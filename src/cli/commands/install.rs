//! Install command - precache the manifest ahead of serving

use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::TilawahResult;
use crate::factory::Components;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let components = Components::from_config(config).await?;
    let controller = components.controller(config);

    ui::intro(&ctx, &format!("tilawah install {}", controller.version()));

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Precaching {} assets from {}...",
        config.routes.manifest.len(),
        config.network.upstream
    ));
    if let Err(e) = controller.install().await {
        spinner.stop_error("Install failed, nothing was written");
        return Err(e);
    }
    spinner.stop(&format!(
        "Precached {} assets into {}",
        config.routes.manifest.len(),
        controller.store_names().static_store
    ));

    if args.no_activate {
        ui::remark(&ctx, "Stores from previous versions were kept");
        ui::outro_success(&ctx, "Installed");
        return Ok(());
    }

    let deleted = controller.activate().await?;
    if deleted.is_empty() {
        ui::step_info(&ctx, "No stale stores to delete");
    }
    for name in &deleted {
        ui::step_ok_detail(&ctx, "Deleted stale store", name);
    }

    ui::outro_success(&ctx, &format!("Controller {} active", controller.version()));
    Ok(())
}
