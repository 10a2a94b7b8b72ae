//! Fetch command - send one request through the controller

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::controller::OfflineBody;
use crate::error::{TilawahError, TilawahResult};
use crate::factory::Components;
use crate::fetch::{Method, Request};
use console::style;
use std::io::{self, Write};

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> TilawahResult<()> {
    let request = build_request(&args)?;
    let components = Components::from_config(config).await?;
    let controller = components.controller(config);

    let response = controller.handle_fetch(&request).await?;

    if let Some(offline) = OfflineBody::parse(&response) {
        eprintln!(
            "{} {}",
            style("Offline:").yellow().bold(),
            offline.message
        );
    }

    let mut stdout = io::stdout().lock();
    if args.include {
        writeln!(stdout, "HTTP {}", response.status)
            .map_err(|e| TilawahError::io("writing response", e))?;
        for (name, value) in &response.headers {
            writeln!(stdout, "{}: {}", name, value)
                .map_err(|e| TilawahError::io("writing response", e))?;
        }
        writeln!(stdout).map_err(|e| TilawahError::io("writing response", e))?;
    }
    stdout
        .write_all(&response.body)
        .map_err(|e| TilawahError::io("writing response", e))?;
    stdout
        .flush()
        .map_err(|e| TilawahError::io("writing response", e))
}

fn build_request(args: &FetchArgs) -> TilawahResult<Request> {
    if !args.url.starts_with('/') {
        return Err(TilawahError::User(format!(
            "URL must be origin-relative (start with /), got {}",
            args.url
        )));
    }

    let base = if args.navigate {
        Request::navigate(args.url.as_str())
    } else {
        Request::get(args.url.as_str())
    };
    let mut request = base.with_method(Method::parse(&args.method));

    for raw in &args.headers {
        let (name, value) = raw.split_once(':').ok_or_else(|| {
            TilawahError::User(format!("Header must look like \"Name: value\", got {}", raw))
        })?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = &args.data {
        request = request.with_body(data.as_bytes());
    }

    Ok(request)
}
