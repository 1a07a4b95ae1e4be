use super::{AppContext, ui};
use crate::core::log::log_action;
use crate::core::trade::{PortfolioValuation, TradeReceipt, TradeService};
use crate::store::session::Session;
use anyhow::{Result, bail};
use comfy_table::Cell;

pub fn login(ctx: &AppContext, username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("Username must not be empty");
    }
    ctx.wallets().ensure_user(username)?;
    ctx.sessions().save(&Session {
        username: Some(username.to_string()),
    })?;
    println!("Logged in as '{username}'");
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    ctx.sessions().clear()?;
    println!("Logged out");
    Ok(())
}

impl PortfolioValuation {
    pub fn display_as_table(&self, user: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Balance"),
            ui::header_cell(&format!("Value ({})", self.base)),
        ]);

        for wallet in &self.wallets {
            let value = match wallet.value {
                Some(v) => ui::number_cell(format!("{v:.2}")),
                None => ui::na_cell(wallet.error.is_some()),
            };
            table.add_row(vec![
                Cell::new(&wallet.code),
                ui::number_cell(format!("{:.4}", wallet.balance)),
                value,
            ]);
        }

        let mut output = format!(
            "Portfolio: {}\n\n",
            ui::style_text(user, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\nTotal Value ({}): {}",
            ui::style_text(&self.base, ui::StyleType::TotalLabel),
            ui::style_text(&format!("{:.2}", self.total), ui::StyleType::TotalValue)
        ));

        let failures: Vec<_> = self
            .wallets
            .iter()
            .filter_map(|w| w.error.as_ref().map(|e| format!("{}: {e}", w.code)))
            .collect();
        if !failures.is_empty() {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(
                    &format!("Excluded from total:\n{}", failures.join("\n")),
                    ui::StyleType::Error
                )
            ));
        }
        output
    }
}

pub fn show(ctx: &AppContext, base: Option<&str>) -> Result<()> {
    let user = ctx.session.require_user()?;
    let base = base.unwrap_or(&ctx.config.default_base);

    let ledger = ctx.wallets();
    let resolver = ctx.resolver();
    let trades = TradeService::new(&ledger, &resolver);
    let valuation = trades.portfolio_value(user, base)?;

    if valuation.wallets.is_empty() {
        println!("No wallets yet. Use `buy` to add a currency.");
        return Ok(());
    }
    println!("{}", valuation.display_as_table(user));
    Ok(())
}

fn print_receipt(verb: &str, receipt: &TradeReceipt) {
    println!(
        "{verb} {:.4} {} at {:.2} USD/{}",
        receipt.amount, receipt.code, receipt.rate, receipt.code
    );
    println!(
        "- {}: {:.4} -> {:.4}",
        receipt.code, receipt.old_balance, receipt.new_balance
    );
}

pub fn buy(ctx: &AppContext, code: &str, amount: f64) -> Result<()> {
    let user = ctx.session.require_user()?;
    let ledger = ctx.wallets();
    let resolver = ctx.resolver();
    let trades = TradeService::new(&ledger, &resolver);

    let receipt = log_action("BUY", user, || trades.buy(user, code, amount))?;
    print_receipt("Bought", &receipt);
    println!(
        "Estimated cost: {} USD",
        ui::style_text(
            &format!("{:.2}", receipt.settlement_value),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}

pub fn sell(ctx: &AppContext, code: &str, amount: f64) -> Result<()> {
    let user = ctx.session.require_user()?;
    let ledger = ctx.wallets();
    let resolver = ctx.resolver();
    let trades = TradeService::new(&ledger, &resolver);

    let receipt = log_action("SELL", user, || trades.sell(user, code, amount))?;
    print_receipt("Sold", &receipt);
    println!(
        "Estimated revenue: {} USD",
        ui::style_text(
            &format!("{:.2}", receipt.settlement_value),
            ui::StyleType::TotalValue
        )
    );
    Ok(())
}
