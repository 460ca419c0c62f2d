//! Entry point for the cmip5-fields application.
//! Handles CLI parsing, model lookup, and dispatches a full-field or boundary extraction.

use clap::Parser;
use cmip5_fields::metadata::{print_field_summary, FieldSummary};
use cmip5_fields::models::load_model_table;
use cmip5_fields::{try_extract_boundary, try_extract_field, ModelDescriptor, PathTemplateLocator};
use log::info;
mod cli;

use cli::Args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    println!(
        r#"
------------------------------------------------------------------
                 CMIP5 field extraction
------------------------------------------------------------------
                        "#
    );

    let model = match &args.models_file {
        Some(path) => load_model_table(path)?
            .into_iter()
            .find(|m| m.name == args.model)
            .unwrap_or_else(|| {
                info!("{} not in {}, using built-in quirks", args.model, path.display());
                ModelDescriptor::lookup(&args.model)
            }),
        None => ModelDescriptor::lookup(&args.model),
    };
    let locator = PathTemplateLocator::new(&args.root, args.template.clone());
    let (start_year, end_year) = args.years;

    let title = format!("{} {} {}", model.name, args.experiment, args.variable);
    if let Some(target_lat) = args.boundary_lat {
        let transect = try_extract_boundary(
            &locator,
            &model,
            &args.experiment,
            &args.variable,
            start_year,
            end_year,
            target_lat,
        )?;
        println!("✅ Extracted transect at {}°", target_lat);
        println!(
            "   Axis: {} points from {:?} to {:?}",
            transect.axis.len(),
            transect.axis.iter().next(),
            transect.axis.iter().last()
        );
        print_field_summary(&title, &FieldSummary::from(&transect));
    } else {
        let field = try_extract_field(
            &locator,
            &model,
            &args.experiment,
            &args.variable,
            start_year,
            end_year,
        )?;
        println!("✅ Extracted field on a {:?} grid", field.lat.shape());
        if let Some(depth) = &field.depth {
            println!("   Vertical levels: {}", depth.num_levels());
        }
        print_field_summary(&title, &FieldSummary::from(&field));
    }

    Ok(())
}
