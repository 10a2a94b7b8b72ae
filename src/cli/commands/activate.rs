//! Activate command - delete stores from previous versions

use crate::config::Config;
use crate::error::TilawahResult;
use crate::factory::Components;
use crate::ui::{self, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config) -> TilawahResult<()> {
    let ctx = UiContext::detect();
    let components = Components::from_config(config).await?;
    let controller = components.controller(config);

    let deleted = controller.evict_stale().await?;
    if deleted.is_empty() {
        ui::step_info(&ctx, "Only live stores present, nothing deleted");
        return Ok(());
    }

    for name in &deleted {
        ui::step_ok_detail(&ctx, "Deleted", name);
    }
    ui::outro_success(
        &ctx,
        &format!("Deleted {} stale store(s)", deleted.len()),
    );
    Ok(())
}
