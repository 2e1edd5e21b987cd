use super::rates::{market_summary, rates_table};
use super::ui;
use crate::core::state::{RateStore, StoreState};
use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const TITLE: &str = "CrystoDolar";
const TAGLINE: &str = "Dólar, Euro y Cripto en tiempo real";

/// Interactive session: re-renders once per second and refreshes on Enter,
/// subject to the manual-refresh cooldown.
pub async fn run(store: &RateStore) -> Result<()> {
    store.initial_load().await;

    let term = console::Term::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        render(&term, store)?;

        tokio::select! {
            _ = ticker.tick() => {}
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(input) if input.trim().eq_ignore_ascii_case("q") => break,
                    Some(_) => {
                        // Checked before the store is invoked; a blocked
                        // attempt never turns into a request.
                        if store.refresh_gate().allowed {
                            store.refresh_rates(true, true).await;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Title, tagline and status lines shown above the table.
fn header_lines(state: &StoreState) -> Vec<String> {
    let mut lines = vec![
        ui::style_text(TITLE, ui::StyleType::Title),
        ui::style_text(TAGLINE, ui::StyleType::Subtle),
    ];

    let mut status = if state.is_online {
        ui::style_text("En línea", ui::StyleType::Value)
    } else {
        ui::style_text("Sin conexión", ui::StyleType::Error)
    };
    if state.is_loading {
        status.push_str(&format!(
            "  {}",
            ui::style_text("Actualizando cotizaciones...", ui::StyleType::Subtle)
        ));
    }
    lines.push(status);
    lines
}

fn render(term: &console::Term, store: &RateStore) -> Result<()> {
    let state = store.snapshot();
    term.clear_screen()?;

    for line in header_lines(&state) {
        println!("{line}");
    }
    println!();

    if let Some(error) = &state.error {
        println!("{}\n", ui::style_text(error, ui::StyleType::Error));
    }

    println!("{}", rates_table(&state));
    for line in market_summary(&state) {
        println!("{line}");
    }

    // Countdown derived from the timestamp on every tick; the label can
    // never drift from the gate itself.
    let gate = store.refresh_gate();
    let hint = if gate.allowed {
        "Enter para actualizar · q para salir".to_string()
    } else {
        format!(
            "Espere {}s para actualizar manualmente · q para salir",
            gate.remaining_secs()
        )
    };
    println!("\n{}", ui::style_text(&hint, ui::StyleType::Subtle));
    Ok(())
}
