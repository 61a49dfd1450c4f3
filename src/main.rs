// ========================================================================================
//
//                                 THE ORCHESTRATOR: UPLIFT
//
// ========================================================================================
//
// This binary conducts the whole reporting pipeline, once per invocation:
// load and filter the survey extract, aggregate wellbeing deltas by treatment
// group and gender, translate deltas into percentile shifts, and render the
// interactive chart artifact. Any failure aborts the run with a non-zero exit
// code; nothing is retried and nothing is charted from partial data.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use uplift::chart::write_chart;
use uplift::data::load_survey;
use uplift::export::write_summary_tsv;
use uplift::summarize::{overall_mean_delta, summarize};

#[derive(Parser, Debug)]
#[clap(
    name = "uplift",
    version,
    about = "Summarizes psychological wellbeing gains from the GiveDirectly Kenya cash-transfer study as an interactive chart."
)]
struct Args {
    /// Path to the tab-delimited survey extract (e.g. UCT_FINAL_CLEAN.tab)
    #[clap(value_name = "DATA_PATH")]
    data: PathBuf,

    /// Output path for the self-contained interactive chart
    #[clap(long, default_value = "wellbeing_chart.html")]
    out: PathBuf,

    /// Optional output path for the derived summary table (TSV)
    #[clap(long)]
    summary: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let data_path = args.data.to_string_lossy();
    let respondents = load_survey(&data_path)?;

    let rows = summarize(&respondents)?;
    let avg_delta = overall_mean_delta(&respondents);
    if let Some(avg) = avg_delta {
        println!("Average Δ z-score across all retained respondents: {avg:.4}");
    }

    println!("Summary by treatment group and gender:");
    for row in &rows {
        println!(
            "  {:<18} {:<7} Δ = {:>6}  ({})",
            row.group.label(),
            row.gender.label(),
            row.delta_display,
            row.percentile_shift
        );
    }

    if let Some(summary_path) = &args.summary {
        write_summary_tsv(&rows, summary_path)?;
        println!("Summary table written to {}", summary_path.display());
    }

    write_chart(&rows, avg_delta, &args.out)?;
    println!("Interactive chart written to {}", args.out.display());
    Ok(())
}
