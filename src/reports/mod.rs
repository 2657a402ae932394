use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use trackforge::optimizer::mutation::{error_bounds, ErrorBand};
use trackforge::optimizer::{OptimizationResult, OptimizationState};
use trackforge::scorer::{ResidualRms, ScoreDetails, Scorer, FORCE_CHANNELS, MOMENT_CHANNELS};
use trackforge::simulator::RunOutcome;
use trackforge::weights::{is_translational, WeightVector};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right_align(table: &mut Table, cols: std::ops::RangeInclusive<usize>) {
    for i in cols {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn fmt_cost(v: f64) -> String {
    if v.is_finite() {
        format!("{:.4}", v)
    } else {
        "inf".to_string()
    }
}

pub fn print_history(state: &OptimizationState) {
    let best = state.best_index();
    let mut table = new_table();

    table.add_row(vec![
        Cell::new("Iter").add_attribute(Attribute::Bold),
        Cell::new("Objective").fg(Color::Cyan),
        Cell::new("Residuals"),
        Cell::new("Forces"),
        Cell::new("Moments"),
        Cell::new("Errors"),
    ]);
    right_align(&mut table, 1..=5);

    for (i, h) in state.history.iter().enumerate() {
        let d = &h.details;
        let iter_cell = if i == best {
            Cell::new(format!("{} *", h.iteration))
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(h.iteration)
        };
        let objective = if d.is_failure() {
            Cell::new(fmt_cost(d.objective)).fg(Color::Red)
        } else {
            Cell::new(fmt_cost(d.objective)).fg(Color::Cyan)
        };

        table.add_row(vec![
            iter_cell,
            objective,
            Cell::new(fmt_cost(d.sum_rms_residuals)),
            Cell::new(fmt_cost(d.sum_rms_forces)),
            Cell::new(fmt_cost(d.sum_rms_moments)),
            Cell::new(fmt_cost(d.sum_rms_errors)),
        ]);
    }
    println!("\n{}", table);
    println!(
        "Iterations: {} of {} (min {}), threshold {}",
        state.iteration, state.params.max_iterations, state.params.min_iterations, state.params.threshold
    );
}

/// Weights with their last tracking error. `initial` adds a column with the
/// template weights for comparison.
pub fn print_weights(weights: &WeightVector, initial: Option<&[f64]>) {
    let mut table = new_table();

    let mut header = vec![
        Cell::new("Coordinate").add_attribute(Attribute::Bold),
        Cell::new("Weight").fg(Color::Cyan),
    ];
    if initial.is_some() {
        header.push(Cell::new("Initial"));
    }
    header.push(Cell::new("RMS Err"));
    header.push(Cell::new("Band"));
    let n_cols = header.len();
    table.add_row(header);
    right_align(&mut table, 1..=n_cols - 2);

    for (i, name) in weights.names().iter().enumerate() {
        let err = weights.rms_err()[i];
        let (err_text, band_cell) = if err.is_finite() {
            // Angles are shown in degrees
            let shown = if is_translational(name) {
                format!("{:.4} m", err)
            } else {
                format!("{:.3} deg", err.to_degrees())
            };
            let band = ErrorBand::classify(err, error_bounds(name));
            let color = match band {
                ErrorBand::Balanced => Color::Green,
                ErrorBand::Under => Color::Yellow,
                ErrorBand::Over => Color::Red,
            };
            (shown, Cell::new(band).fg(color))
        } else {
            ("-".to_string(), Cell::new("-"))
        };

        let mut row = vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.4}", weights.values()[i])).fg(Color::Cyan),
        ];
        if let Some(init) = initial {
            row.push(Cell::new(
                init.get(i).map(|v| format!("{:.4}", v)).unwrap_or_default(),
            ));
        }
        row.push(Cell::new(err_text));
        row.push(band_cell);
        table.add_row(row);
    }
    println!("\n{}", table);
}

pub fn print_result(result: &OptimizationResult) {
    println!(
        "\n🏆 Best cost {} (history index {}, {} iterations)",
        fmt_cost(result.best_cost),
        result.best_index,
        result.iterations
    );
    match &result.final_outcome {
        RunOutcome::Completed(a) => println!(
            "   Final run: {} (confirmed cost {})",
            a.residuals.parent().map(|p| p.display().to_string()).unwrap_or_default(),
            fmt_cost(result.final_details.objective)
        ),
        RunOutcome::Failed { reason } => println!("   Final run failed: {}", reason),
    }
}

pub fn print_score(details: &ScoreDetails, rms: &ResidualRms, scorer: &Scorer) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Residual").add_attribute(Attribute::Bold),
        Cell::new("RMS"),
        Cell::new("Limit"),
        Cell::new("RMS / Limit"),
    ]);
    right_align(&mut table, 1..=3);

    let channels = FORCE_CHANNELS
        .iter()
        .zip(rms.forces.iter())
        .map(|(c, v)| (c, *v, scorer.norms.force))
        .chain(
            MOMENT_CHANNELS
                .iter()
                .zip(rms.moments.iter())
                .map(|(c, v)| (c, *v, scorer.norms.moment)),
        );
    for (name, value, limit) in channels {
        let ratio = value / limit;
        let ratio_cell = if ratio <= 1.0 {
            Cell::new(format!("{:.3}", ratio)).fg(Color::Green)
        } else {
            Cell::new(format!("{:.3}", ratio)).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.3}", value)),
            Cell::new(format!("{:.3}", limit)),
            ratio_cell,
        ]);
    }
    println!("\n{}", table);

    println!("objective\t{}", fmt_cost(details.objective));
    println!("sum_rms_residuals\t{}", fmt_cost(details.sum_rms_residuals));
    println!("sum_rms_forces\t{}", fmt_cost(details.sum_rms_forces));
    println!("sum_rms_moments\t{}", fmt_cost(details.sum_rms_moments));
    println!("sum_rms_errors\t{}", fmt_cost(details.sum_rms_errors));
}
