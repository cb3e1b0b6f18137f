//! Pure cart partitioning logic.
//!
//! Everything in this module is side-effect free so that the checkout orchestrator's retry and partial-failure
//! behaviour can be tested without a live backend. The cart itself is client-held convenience state with no
//! transactional guarantees; the engine only ever sees the partitions derived from it.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db_types::{Centavos, MealPeriod, NewOrder, PaymentMethod},
    helpers::client_order_id_for,
};

/// One selected item in a parent's cart: a product, for a child, on a delivery date, in a serving window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub meal_period: MealPeriod,
    pub quantity: i64,
    /// Price shown when the line was added. Advisory; the engine re-prices at commit.
    pub unit_price: Centavos,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drops every line belonging to the given (student, date) partition. Called for each partition that
    /// checked out successfully; failed partitions stay in the cart for retry.
    pub fn remove_partition(&mut self, student_id: i64, scheduled_for: NaiveDate) {
        self.lines.retain(|l| !(l.student_id == student_id && l.scheduled_for == scheduled_for));
    }
}

/// A group of cart lines sharing one (student, delivery date) pair — the unit of order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPartition {
    pub student_id: i64,
    pub scheduled_for: NaiveDate,
    pub lines: Vec<CartLine>,
}

impl CartPartition {
    /// Cart-side estimate of the partition total, from the prices the client saw. Used for the orchestrator's
    /// fail-fast balance check; the engine recomputes the authoritative total at commit.
    pub fn estimated_total(&self) -> Centavos {
        self.lines.iter().map(|l| l.unit_price * l.quantity).sum()
    }

    /// Builds the order submission for this partition, deriving its idempotency key from the checkout attempt id
    /// and the partition key.
    pub fn to_new_order(
        &self,
        parent_id: &str,
        checkout_id: &Uuid,
        payment_method: PaymentMethod,
        notes: Option<&str>,
    ) -> NewOrder {
        let client_order_id = client_order_id_for(checkout_id, self.student_id, self.scheduled_for);
        let mut order = NewOrder::new(parent_id, self.student_id, client_order_id, self.scheduled_for, payment_method);
        order.notes = notes.map(String::from);
        for line in &self.lines {
            order = order.with_line(line.product_id, line.quantity, line.unit_price, line.meal_period);
        }
        order
    }
}

/// Splits a cart into one partition per (student, delivery date), in (student, date) ascending order.
///
/// When `dates` is given, lines for other dates are excluded *before* partitioning (partial checkout); they stay
/// untouched in the caller's cart.
pub fn partition_cart(cart: &Cart, dates: Option<&[NaiveDate]>) -> Vec<CartPartition> {
    let mut groups: BTreeMap<(i64, NaiveDate), Vec<CartLine>> = BTreeMap::new();
    for line in &cart.lines {
        if let Some(allowed) = dates {
            if !allowed.contains(&line.scheduled_for) {
                continue;
            }
        }
        groups.entry((line.student_id, line.scheduled_for)).or_default().push(line.clone());
    }
    groups
        .into_iter()
        .map(|((student_id, scheduled_for), lines)| CartPartition { student_id, scheduled_for, lines })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn line(product_id: i64, student_id: i64, day: &str, qty: i64) -> CartLine {
        CartLine {
            product_id,
            student_id,
            scheduled_for: date(day),
            meal_period: MealPeriod::Lunch,
            quantity: qty,
            unit_price: Centavos::from_pesos(50),
        }
    }

    #[test]
    fn groups_by_student_and_date() {
        let cart = Cart::new(vec![
            line(1, 7, "2024-06-03", 1),
            line(2, 7, "2024-06-03", 2),
            line(1, 8, "2024-06-03", 1),
            line(1, 7, "2024-06-04", 1),
        ]);
        let partitions = partition_cart(&cart, None);
        assert_eq!(partitions.len(), 3);
        assert_eq!((partitions[0].student_id, partitions[0].scheduled_for), (7, date("2024-06-03")));
        assert_eq!(partitions[0].lines.len(), 2);
        assert_eq!((partitions[1].student_id, partitions[1].scheduled_for), (7, date("2024-06-04")));
        assert_eq!((partitions[2].student_id, partitions[2].scheduled_for), (8, date("2024-06-03")));
    }

    #[test]
    fn date_restriction_is_applied_before_partitioning() {
        let cart = Cart::new(vec![
            line(1, 7, "2024-06-03", 1),
            line(1, 7, "2024-06-04", 1),
            line(1, 8, "2024-06-04", 1),
        ]);
        let only = [date("2024-06-04")];
        let partitions = partition_cart(&cart, Some(&only));
        assert_eq!(partitions.len(), 2);
        assert!(partitions.iter().all(|p| p.scheduled_for == date("2024-06-04")));
    }

    #[test]
    fn partitioning_leaves_the_cart_untouched() {
        let cart = Cart::new(vec![line(1, 7, "2024-06-03", 1), line(1, 7, "2024-06-04", 1)]);
        let _ = partition_cart(&cart, Some(&[date("2024-06-03")]));
        assert_eq!(cart.lines.len(), 2);
    }

    #[test]
    fn estimated_total_sums_line_extensions() {
        let mut partition = CartPartition { student_id: 7, scheduled_for: date("2024-06-03"), lines: vec![] };
        partition.lines.push(line(1, 7, "2024-06-03", 2));
        partition.lines.push(line(2, 7, "2024-06-03", 1));
        assert_eq!(partition.estimated_total(), Centavos::from_pesos(150));
    }

    #[test]
    fn removing_a_partition_keeps_other_lines() {
        let mut cart = Cart::new(vec![
            line(1, 7, "2024-06-03", 1),
            line(2, 8, "2024-06-04", 1),
        ]);
        cart.remove_partition(7, date("2024-06-03"));
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].student_id, 8);
    }

    #[test]
    fn partition_keys_are_stable_per_attempt() {
        let cart = Cart::new(vec![line(1, 7, "2024-06-03", 1)]);
        let checkout_id = Uuid::new_v4();
        let partitions = partition_cart(&cart, None);
        let a = partitions[0].to_new_order("parent-1", &checkout_id, PaymentMethod::Cash, None);
        let b = partitions[0].to_new_order("parent-1", &checkout_id, PaymentMethod::Cash, None);
        assert_eq!(a.client_order_id, b.client_order_id);
        let retry = partitions[0].to_new_order("parent-1", &Uuid::new_v4(), PaymentMethod::Cash, None);
        assert_ne!(a.client_order_id, retry.client_order_id);
    }
}
