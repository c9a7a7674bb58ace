//! Generic resource handlers: list, get, create, update, delete.

use std::sync::Arc;

use carehub_api::{ResourceClient, UpdateMethod};
use carehub_core::{ClientContext, CoreError, FilterMode};
use tracing::debug;

use crate::cli::{GlobalOpts, ListArgs, OutputFormat, ResourceArgs, ResourceCommand};
use crate::error::CliError;
use crate::output;

use super::rows::Render;
use super::util;

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<T: Render>(
    ctx: &ClientContext,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = ctx.typed::<T>();
    match args.command {
        ResourceCommand::List(list) => list_page(ctx, client, &list, global).await,

        ResourceCommand::Get { id } => {
            let record = ctx.query_item(&client, &id).await.into_result()?;
            print_record(&*record, global)
        }

        ResourceCommand::Create(body) => {
            let body = util::read_body(&body)?;
            let tracker = ctx.mutation(client).with_label(T::LABEL);
            let created = finish(ctx, tracker.create(&body).await, global)?;
            print_written(created.as_ref(), global)
        }

        ResourceCommand::Update { id, body, replace } => {
            let body = util::read_body(&body)?;
            let method = if replace { UpdateMethod::Put } else { UpdateMethod::Patch };
            let tracker = ctx
                .mutation(client.with_update_method(method))
                .with_label(T::LABEL);
            let updated = finish(ctx, tracker.update(&id, &body).await, global)?;
            print_written(updated.as_ref(), global)
        }

        ResourceCommand::Delete { id } => {
            let prompt = format!("Delete {} '{id}'?", T::LABEL.to_lowercase());
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            let tracker = ctx.mutation(client).with_label(T::LABEL);
            finish(ctx, tracker.remove(&id).await, global)
        }
    }
}

// ── Listing ─────────────────────────────────────────────────────────

async fn list_page<T: Render>(
    ctx: &ClientContext,
    client: ResourceClient<T>,
    args: &ListArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut options = ctx.listing_options();
    if let Some(size) = args.page_size {
        options.page_size = size;
    }
    options.mode = filter_mode(args);
    // Pages past the end are clamped once the total is known
    options.page = args.page;
    let listing = ctx.listing_with(Arc::new(client), options);

    let view = listing.settled().await;
    listing.close();
    debug!(
        mode = %view.selection.mode,
        page = view.page_number,
        total_pages = view.total_pages,
        "listing settled"
    );

    if view.is_error {
        return Err(view
            .error
            .map_or_else(|| CoreError::Internal("listing failed".into()), |e| (*e).clone())
            .into());
    }

    let rows: &[T] = &view.rows;
    let out = output::render_list(global.output, rows, T::row, T::id)?;
    output::print_output(&out, global.quiet);

    if global.output == OutputFormat::Table && !global.quiet {
        eprintln!(
            "Page {} of {} ({} records)",
            view.page_number, view.total_pages, view.total_records
        );
        if view.degraded {
            eprintln!("Note: the backend response was not recognized; no rows shown.");
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────

/// The one filter mode the flags select; clap keeps them mutually exclusive.
fn filter_mode(args: &ListArgs) -> FilterMode {
    if let Some(ref category) = args.category {
        FilterMode::ByCategory(category.clone())
    } else if let Some(condition) = args.condition {
        FilterMode::ByCondition(condition.to_string())
    } else if let Some(ref text) = args.search {
        FilterMode::ByFreeText(text.clone())
    } else {
        FilterMode::Unfiltered
    }
}

fn print_record<T: Render>(record: &T, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, record, T::detail, T::id)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Print the record a write returned. A write answered without a body has
/// nothing to show beyond its notification.
fn print_written<T: Render>(record: Option<&T>, global: &GlobalOpts) -> Result<(), CliError> {
    match record {
        Some(record) => print_record(record, global),
        None => Ok(()),
    }
}

/// Echo the mutation's notification on success; on conflict, prefer its
/// resource-specific wording over the generic one.
fn finish<R>(ctx: &ClientContext, result: Result<R, CoreError>, global: &GlobalOpts) -> Result<R, CliError> {
    let notice = ctx.notifications().current();
    match result {
        Ok(value) => {
            if let Some(ref notice) = notice {
                output::print_notification(notice, global.quiet);
            }
            Ok(value)
        }
        Err(err @ CoreError::ConflictInUse { .. }) => Err(notice.map_or_else(
            || err.into(),
            |n| CliError::Conflict { message: n.message },
        )),
        Err(err) => Err(err.into()),
    }
}
