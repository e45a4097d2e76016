use crate::domain::models::purchase::Buyer;

pub const CSV_HEADERS: [&str; 9] = [
    "Name",
    "Email",
    "Phone",
    "Ticket Type",
    "Category",
    "Quantity",
    "Amount",
    "Purchase Date",
    "Status",
];

/// Renders the buyers table as CSV. Fields are joined verbatim: values containing
/// commas or quotes are not escaped.
pub fn to_csv(buyers: &[Buyer]) -> String {
    let mut rows = Vec::with_capacity(buyers.len() + 1);
    rows.push(CSV_HEADERS.join(","));

    for buyer in buyers {
        let p = &buyer.purchase;
        let fields = [
            p.buyer_name.clone(),
            p.buyer_email.clone(),
            p.buyer_phone.clone().unwrap_or_default(),
            buyer.ticket_type.to_string(),
            buyer.ticket_category.clone(),
            p.quantity.to_string(),
            p.total_amount.to_string(),
            p.purchased_at.format("%Y-%m-%d").to_string(),
            p.payment_status.label().to_string(),
        ];
        rows.push(fields.join(","));
    }

    rows.join("\n")
}

/// Download name for an event's export, e.g. `Tech_Conference_2024_buyers.csv`.
pub fn export_file_name(event_title: &str) -> String {
    let stem = event_title.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{}_buyers.csv", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::purchase::{PaymentStatus, Purchase};
    use crate::domain::models::ticket_category::TicketType;
    use chrono::{TimeZone, Utc};

    fn john() -> Buyer {
        Buyer {
            purchase: Purchase {
                id: "1".into(),
                event_id: "ev-1".into(),
                ticket_category_id: "cat-1".into(),
                buyer_name: "John Doe".into(),
                buyer_email: "john@example.com".into(),
                buyer_phone: None,
                quantity: 1,
                total_amount: 99,
                purchased_at: Utc.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap(),
                payment_status: PaymentStatus::Paid,
                seat_numbers: Some(vec!["A-12".into()]),
            },
            ticket_type: TicketType::Normal,
            ticket_category: "Early Bird".into(),
        }
    }

    #[test]
    fn single_buyer_export() {
        let csv = to_csv(&[john()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Name,Email,Phone,Ticket Type,Category,Quantity,Amount,Purchase Date,Status");
        assert_eq!(lines[1], "John Doe,john@example.com,,NORMAL,Early Bird,1,99,2024-02-01,paid");
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(to_csv(&[]), CSV_HEADERS.join(","));
    }

    #[test]
    fn delimiters_in_values_are_not_escaped() {
        let mut buyer = john();
        buyer.purchase.buyer_name = "Doe, John".into();
        let csv = to_csv(&[buyer]);
        let data = csv.lines().nth(1).unwrap();
        assert_eq!(data.split(',').count(), 10);
    }

    #[test]
    fn file_name_collapses_whitespace() {
        assert_eq!(export_file_name("Tech Conference  2024"), "Tech_Conference_2024_buyers.csv");
    }
}
