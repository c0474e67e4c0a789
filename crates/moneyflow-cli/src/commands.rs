use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use moneyflow_core::models::{
    Account, AccountType, Rule, Tag, Transaction, TransactionFilter, TransactionType,
};
use moneyflow_core::rules::{completions, dry_run_changes};
use moneyflow_core::snippets::SnippetStore;
use moneyflow_core::utils::{format_amount, format_date, format_table, truncate_string};

use crate::{AppContext, Command, FilterArgs};

/// Widest title shown in transaction listings
const TITLE_WIDTH: usize = 40;

pub async fn run(command: Command, ctx: &AppContext) -> Result<()> {
    let client = &ctx.client;
    match command {
        Command::Login { username } => login(ctx, username).await,
        Command::Logout => {
            client.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Tags => {
            let tags = client.list_tags().await?;
            let rows = tags
                .iter()
                .map(|t| vec![t.id.to_string(), t.name.clone(), t.color.clone().unwrap_or_default()])
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "NAME", "COLOR"], &rows));
            Ok(())
        }
        Command::TagCreate { name } => {
            let tag = client.create_tag(Tag::new(name)).await?;
            println!("Created tag {} ({})", tag.name, tag.id);
            Ok(())
        }
        Command::Categories => {
            let categories = client.list_categories().await?;
            let rows = categories
                .iter()
                .map(|c| vec![c.id.to_string(), c.name.clone()])
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "NAME"], &rows));
            Ok(())
        }
        Command::Currencies => {
            let currencies = client.list_currencies().await?;
            let rows = currencies
                .iter()
                .map(|c| {
                    vec![
                        c.code.clone(),
                        c.rate.clone(),
                        c.decimal_places.to_string(),
                        if c.is_active { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", format_table(&["CODE", "RATE", "DECIMALS", "ACTIVE"], &rows));
            Ok(())
        }
        Command::Config => {
            let configuration = client.get_configuration().await?;
            println!("Endpoint:      {}", client.endpoint());
            println!("Base currency: {}", configuration.base_currency);
            println!("Version:       {}", configuration.version);
            Ok(())
        }
        Command::Accounts => {
            let accounts = client.list_accounts().await?;
            println!("{}", accounts_table(&accounts));
            Ok(())
        }
        Command::ApplicableAccounts { transaction_type } => {
            let transaction_type = TransactionType::parse(&transaction_type)
                .ok_or_else(|| anyhow::anyhow!("Unknown transaction type '{}'", transaction_type))?;
            let applicable = client.get_applicable_accounts(transaction_type).await?;
            println!("Source accounts:\n{}\n", accounts_table(&applicable.source_accounts));
            println!("Destination accounts:\n{}", accounts_table(&applicable.destination_accounts));
            Ok(())
        }
        Command::AccountCreate {
            name,
            currency,
            account_type,
        } => {
            let account_type = AccountType::parse(&account_type)
                .ok_or_else(|| anyhow::anyhow!("Unknown account type '{}'", account_type))?;
            let account = client
                .create_account(Account::new(name, currency, account_type))
                .await?;
            println!("Created account {} ({})", account.name, account.id);
            Ok(())
        }
        Command::Transactions {
            filter,
            limit,
            skip,
        } => {
            let mut filter = build_filter(&filter)?;
            filter.limit = limit;
            filter.skip = skip;
            let transactions = client.list_transactions(&filter).await?;
            println!("{}", transactions_table(&transactions));
            Ok(())
        }
        Command::Export { filter, output } => {
            let filter = build_filter(&filter)?;
            let transactions = client.export_transactions(&filter).await?;
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    serde_json::to_writer_pretty(file, &transactions)?;
                    eprintln!("Exported {} transactions to {}", transactions.len(), path.display());
                }
                None => {
                    serde_json::to_writer_pretty(io::stdout().lock(), &transactions)?;
                    println!();
                }
            }
            Ok(())
        }
        Command::Rules => {
            let rules = client.list_rules().await?;
            let rows = rules
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.sort_order.to_string(),
                        r.title.clone(),
                        r.group_name.clone(),
                        if r.enabled { "on" } else { "off" }.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "ORDER", "TITLE", "GROUP", "STATE"], &rows));
            Ok(())
        }
        Command::RuleDryRun {
            script,
            transaction_id,
        } => {
            let script = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let result = client.dry_run_rule(&Rule::draft(script), transaction_id).await?;
            if !result.rule_applied {
                println!("Rule did not apply.");
                return Ok(());
            }
            let changes = dry_run_changes(&result)?;
            if changes.is_empty() {
                println!("Rule applied without changes.");
            }
            for change in changes {
                println!("{}", change.describe());
            }
            Ok(())
        }
        Command::RuleComplete { prefix } => {
            for completion in completions(&prefix) {
                println!("{:<28} {}", completion.label, completion.detail);
            }
            Ok(())
        }
        Command::ScheduledRules => {
            let rules = client.list_scheduled_rules().await?;
            let rows = rules
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.title.clone(),
                        r.cron_expression.clone(),
                        r.last_run_at.as_ref().map(format_date).unwrap_or_default(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "TITLE", "SCHEDULE", "LAST RUN"], &rows));
            Ok(())
        }
        Command::Tokens => {
            let tokens = client.list_service_tokens().await?;
            let rows = tokens
                .iter()
                .map(|t| {
                    vec![
                        t.id.clone(),
                        t.name.clone(),
                        t.expires_at.as_ref().map(format_date).unwrap_or_else(|| "never".to_string()),
                        if t.is_expired() { "expired" } else { "" }.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "NAME", "EXPIRES", ""], &rows));
            Ok(())
        }
        Command::TokenCreate { name, ttl_days } => {
            let created = client.create_service_token(&name, ttl_days).await?;
            println!("Created token {} ({})", created.service_token.name, created.service_token.id);
            println!("Secret (shown only once): {}", created.token);
            Ok(())
        }
        Command::TokenRevoke { id } => {
            client.revoke_service_token(&id).await?;
            println!("Revoked token {}", id);
            Ok(())
        }
        Command::Snippets => {
            let store = SnippetStore::new(&ctx.data_dir);
            let rows = store
                .list()?
                .iter()
                .map(|s| {
                    vec![
                        s.id.to_string(),
                        s.title.clone(),
                        s.transactions.len().to_string(),
                        format_date(&s.created_at),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", format_table(&["ID", "TITLE", "TRANSACTIONS", "CREATED"], &rows));
            Ok(())
        }
        Command::SnippetSave { title, file } => {
            let transactions = read_transactions(&file)?;
            let snippet = SnippetStore::new(&ctx.data_dir).save(&title, transactions)?;
            println!("Saved snippet {} ({})", snippet.title, snippet.id);
            Ok(())
        }
        Command::SnippetRename { id, title } => {
            SnippetStore::new(&ctx.data_dir).rename(id, &title)?;
            println!("Renamed snippet {}", id);
            Ok(())
        }
        Command::SnippetReplay { id } => {
            let outcome = SnippetStore::new(&ctx.data_dir).replay(client, id).await?;
            println!("{}", transactions_table(&outcome.created));
            if outcome.is_complete() {
                return Ok(());
            }
            for failure in &outcome.failed {
                eprintln!("Not created: #{} {}: {:#}", failure.index + 1, failure.title, failure.error);
            }
            anyhow::bail!(
                "{} of {} transactions were not created",
                outcome.failed.len(),
                outcome.failed.len() + outcome.created.len()
            )
        }
        Command::SnippetDelete { id } => {
            if SnippetStore::new(&ctx.data_dir).delete(id)? {
                println!("Deleted snippet {}", id);
            } else {
                println!("No snippet {}", id);
            }
            Ok(())
        }
    }
}

async fn login(ctx: &AppContext, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", username))
        .context("Failed to read password")?;

    ctx.client.login(&username, &password).await?;

    let mut config = ctx.config.clone();
    config.last_username = Some(username.clone());
    config.save()?;
    println!("Logged in as {}.", username);
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No input given");
    }
    Ok(value)
}

fn build_filter(args: &FilterArgs) -> Result<TransactionFilter> {
    Ok(TransactionFilter {
        from_date: args.from.as_deref().map(parse_day).transpose()?,
        // inclusive: everything before the following midnight
        to_date: args
            .to
            .as_deref()
            .map(|d| parse_day(d).map(|start| start + Duration::days(1)))
            .transpose()?,
        account_ids: args.accounts.clone(),
        text_query: args.query.clone(),
        ..Default::default()
    })
}

fn parse_day(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))?;
    Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
}

fn read_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).context("Expected a JSON array of transactions")
}

fn accounts_table(accounts: &[Account]) -> String {
    let rows = accounts
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                a.account_type.display_name().to_string(),
                format_amount(&a.current_balance, &a.currency),
            ]
        })
        .collect::<Vec<_>>();
    format_table(&["ID", "NAME", "TYPE", "BALANCE"], &rows)
}

fn transactions_table(transactions: &[Transaction]) -> String {
    let rows = transactions
        .iter()
        .map(|t| {
            let amount = if t.source_amount.is_empty() {
                format_amount(&t.destination_amount, &t.destination_currency)
            } else {
                format_amount(&t.source_amount, &t.source_currency)
            };
            vec![
                t.id.to_string(),
                format_date(&t.transaction_date),
                t.transaction_type.display_name().to_string(),
                truncate_string(&t.title, TITLE_WIDTH),
                amount,
            ]
        })
        .collect::<Vec<_>>();
    format_table(&["ID", "DATE", "TYPE", "TITLE", "AMOUNT"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        let day = parse_day("2024-02-29").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert!(parse_day("29/02/2024").is_err());
    }

    #[test]
    fn test_filter_to_date_is_inclusive() {
        let args = FilterArgs {
            from: Some("2024-01-01".to_string()),
            to: Some("2024-01-31".to_string()),
            accounts: vec![3],
            query: None,
        };
        let filter = build_filter(&args).unwrap();
        assert_eq!(filter.from_date, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(filter.to_date, Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()));
        assert_eq!(filter.account_ids, vec![3]);
    }
}
