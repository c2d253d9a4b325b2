//! Cart pricing.
//!
//! Every card is personalised, so a cart line always counts as one unit
//! whatever quantity the backend has stored.

use pgcards_core::{CurrencyCode, Price};

use crate::backend::CartItem;

/// Unit price of a line: the variant's price when it has one, otherwise the
/// product's base price.
#[must_use]
pub fn line_price(item: &CartItem) -> Price {
    item.product.price_for(item.variant_id.as_ref())
}

/// Sum of line prices with quantity forced to one.
///
/// The cart is priced in the first line's currency; lines in another
/// currency are skipped with a warning.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Price {
    let currency = items
        .first()
        .map_or(CurrencyCode::default(), |item| item.product.currency);

    let amount = items
        .iter()
        .map(line_price)
        .filter(|price| {
            let same = price.currency_code == currency;
            if !same {
                tracing::warn!(
                    expected = %currency,
                    found = %price.currency_code,
                    "Cart line in a different currency skipped from subtotal"
                );
            }
            same
        })
        .map(|price| price.amount)
        .sum();

    Price {
        amount,
        currency_code: currency,
    }
}

#[cfg(test)]
mod tests {
    use pgcards_core::{CartItemId, ProductId, VariantId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::backend::{Product, Variant};

    fn item(variant: Option<&str>, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new("line"),
            product: Product {
                id: ProductId::new("prod"),
                title: "PVC Card".to_string(),
                description: String::new(),
                category: String::new(),
                material: String::new(),
                base_price: Decimal::from(899),
                currency: CurrencyCode::AED,
                features: Vec::new(),
                variants: vec![Variant {
                    id: VariantId::new("v1"),
                    color: "Black".to_string(),
                    finish: "Matte".to_string(),
                    price: Some(Decimal::from(999)),
                    images: Vec::new(),
                }],
                images: Vec::new(),
            },
            variant_id: variant.map(VariantId::new),
            quantity,
        }
    }

    #[test]
    fn test_variant_price_wins_and_quantity_ignored() {
        let total = subtotal(&[item(Some("v1"), 3)]);
        assert_eq!(total.amount, Decimal::from(999));
        assert_eq!(total.currency_code, CurrencyCode::AED);
    }

    #[test]
    fn test_base_price_when_no_variant() {
        assert_eq!(line_price(&item(None, 1)).amount, Decimal::from(899));
        assert_eq!(line_price(&item(Some("missing"), 1)).amount, Decimal::from(899));
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let total = subtotal(&[item(Some("v1"), 2), item(None, 5)]);
        assert_eq!(total.amount, Decimal::from(1898));
    }

    #[test]
    fn test_empty_cart_is_zero() {
        assert_eq!(subtotal(&[]).amount, Decimal::ZERO);
    }
}
