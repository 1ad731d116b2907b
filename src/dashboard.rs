// 📊 Dashboard - registry cards built from ledger data
//
// Three cards, always in this order: clients, purchases, payments. Each lists
// the latest active records newest first; money goes through the formatter.

use crate::currency::CurrencyFormatter;
use crate::entities::{Client, Payment, Purchase, PurchaseStatus};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::registry_card::{RegistryCard, RegistryEntry};

pub const CLIENTS_ROUTE: &str = "/clients";
pub const PURCHASES_ROUTE: &str = "/purchases";
pub const PAYMENTS_ROUTE: &str = "/payments";

/// Color token shown next to a purchase's value
pub fn status_color(status: PurchaseStatus) -> &'static str {
    match status {
        PurchaseStatus::Paid => "green",
        PurchaseStatus::Partial => "yellow",
        PurchaseStatus::Pending => "red",
    }
}

pub fn build_dashboard(
    ledger: &Ledger,
    formatter: &CurrencyFormatter,
    recent: u32,
) -> Result<Vec<RegistryCard>> {
    let clients = ledger.recent_clients(recent)?;
    let purchases = ledger.recent_purchases(recent)?;
    let payments = ledger.recent_payments(recent)?;

    let active_clients = ledger.count_active_clients()?;
    let outstanding = ledger.outstanding_total()?;

    Ok(vec![
        clients_card(&clients, active_clients)?,
        purchases_card(&purchases, formatter, outstanding)?,
        payments_card(&payments, formatter)?,
    ])
}

fn clients_card(clients: &[Client], active: i64) -> Result<RegistryCard> {
    let entries = clients
        .iter()
        .map(|c| -> Result<RegistryEntry> {
            let contact = c
                .phone
                .as_deref()
                .or(c.email.as_deref())
                .unwrap_or("-")
                .to_string();
            let mut entry = RegistryEntry::new(c.id, c.name.as_str(), contact)?;
            if let Some(nickname) = &c.nickname {
                entry = entry.with_complement(format!("@{}", nickname));
            }
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    let card = RegistryCard::new("clients", "Clients", CLIENTS_ROUTE, "See all clients")?
        .with_subtitle(format!("{} active", active))
        .with_icon("people")
        .with_icon_color("blue")
        .with_entries(entries);

    Ok(card)
}

fn purchases_card(
    purchases: &[Purchase],
    formatter: &CurrencyFormatter,
    outstanding: f64,
) -> Result<RegistryCard> {
    let entries = purchases
        .iter()
        .map(|p| -> Result<RegistryEntry> {
            let entry = RegistryEntry::new(p.id, p.description.as_str(), formatter.format(p.total_value))?
                .with_complement(format!("{} · {}", p.note_number, p.status))
                .with_value_color(status_color(p.status));
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    let card = RegistryCard::new("purchases", "Purchases", PURCHASES_ROUTE, "See all purchases")?
        .with_subtitle(format!("Outstanding {}", formatter.format(outstanding)))
        .with_icon("shopping_cart")
        .with_icon_color("magenta")
        .with_entries(entries);

    Ok(card)
}

fn payments_card(payments: &[Payment], formatter: &CurrencyFormatter) -> Result<RegistryCard> {
    let entries = payments
        .iter()
        .map(|p| -> Result<RegistryEntry> {
            let entry = RegistryEntry::new(p.id, p.receipt_number.as_str(), formatter.format(p.amount))?
                .with_complement(p.method.as_str())
                .with_value_color("green");
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    let card = RegistryCard::new("payments", "Payments", PAYMENTS_ROUTE, "See all payments")?
        .with_icon("payments")
        .with_icon_color("green")
        .with_value_color("green")
        .with_entries(entries);

    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NewClient, NewPayment, NewPurchase};
    use crate::registry_card::{DisplayValue, RegistryId};

    fn seeded() -> Ledger {
        let mut ledger = Ledger::in_memory().unwrap();
        let joao = ledger
            .create_client(NewClient::new("João Silva").with_nickname("joao").with_phone("11999999999"))
            .unwrap();
        let maria = ledger
            .create_client(NewClient::new("Maria Souza").with_nickname("maria"))
            .unwrap();

        ledger
            .create_purchase(
                joao.id,
                NewPurchase::new("Seeds", 100.0)
                    .with_note_number("NF-0001")
                    .with_payment(NewPayment::new(50.0, "Pix").with_receipt_number("REC-0001")),
            )
            .unwrap();
        ledger
            .create_purchase(maria.id, NewPurchase::new("Fertilizer", 200.0).with_note_number("NF-0003"))
            .unwrap();

        ledger
    }

    #[test]
    fn test_three_cards_in_order() {
        let cards = build_dashboard(&seeded(), &CurrencyFormatter::default(), 5).unwrap();

        let routes: Vec<&str> = cards.iter().map(|c| c.route.as_str()).collect();
        assert_eq!(routes, vec![CLIENTS_ROUTE, PURCHASES_ROUTE, PAYMENTS_ROUTE]);
        assert_eq!(cards[0].subtitle.as_deref(), Some("2 active"));
        assert_eq!(cards[1].subtitle.as_deref(), Some("Outstanding R$\u{a0}250,00"));
    }

    #[test]
    fn test_entries_newest_first_with_money() {
        let cards = build_dashboard(&seeded(), &CurrencyFormatter::default(), 5).unwrap();

        let names: Vec<&str> = cards[1].entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Fertilizer", "Seeds"]);

        let seeds = &cards[1].recent_registries[1];
        assert_eq!(seeds.value, DisplayValue::Text("R$\u{a0}100,00".into()));
        assert_eq!(seeds.value_complement.as_deref(), Some("NF-0001 · partial"));
        assert_eq!(seeds.value_color.as_ref().map(|c| c.as_str()), Some("yellow"));

        let joao = &cards[0].recent_registries[1];
        assert_eq!(joao.value_complement.as_deref(), Some("@joao"));
        assert_eq!(joao.value, DisplayValue::Text("11999999999".into()));

        let payment = &cards[2].recent_registries[0];
        assert_eq!(payment.id, RegistryId::Number(1));
        assert_eq!(payment.name, "REC-0001");
    }

    #[test]
    fn test_recent_limit_and_empty_ledger() {
        let cards = build_dashboard(&seeded(), &CurrencyFormatter::default(), 1).unwrap();
        assert!(cards.iter().all(|c| c.recent_registries.len() <= 1));

        let empty = build_dashboard(&Ledger::in_memory().unwrap(), &CurrencyFormatter::default(), 5)
            .unwrap();
        assert_eq!(empty.len(), 3);
        assert!(empty.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(PurchaseStatus::Paid), "green");
        assert_eq!(status_color(PurchaseStatus::Partial), "yellow");
        assert_eq!(status_color(PurchaseStatus::Pending), "red");
    }
}
