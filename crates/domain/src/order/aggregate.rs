//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::account::{Requester, User};
use crate::value_objects::{Money, ShippingAddress};

/// An item in an order, fixed at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,

    /// Price per unit when the order was placed.
    pub price: Money,

    pub qty: u32,
}

impl OrderItem {
    /// Returns the total price for this item (qty * price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.qty)
    }
}

/// Payment confirmation supplied by the client, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub email_address: Option<String>,
}

/// Everything a customer submits at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub tax_price: Money,
    pub shipping_price: Money,
    pub total_price: Money,
    pub delivery_type: Option<String>,
}

/// Order aggregate root.
///
/// Immutable once placed except for the paid and delivered flags, which
/// only ever go from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    user_id: UserId,

    /// Owner's name and email at placement time.
    user_name: String,
    user_email: String,

    items: Vec<OrderItem>,

    shipping_address: ShippingAddress,
    payment_method: String,
    payment_result: Option<PaymentResult>,

    tax_price: Money,
    shipping_price: Money,
    total_price: Money,

    delivery_type: Option<String>,

    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,

    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Validates a draft and builds an unpaid, undelivered order for `customer`.
    pub fn place(customer: &User, draft: OrderDraft) -> Result<Self, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        for item in &draft.items {
            if item.qty == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.qty,
                });
            }
            if item.price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    field: "item price",
                    price: item.price.cents(),
                });
            }
            if item.price > Money::MAX_UNIT_PRICE {
                return Err(OrderError::AmountTooLarge {
                    field: "item price",
                });
            }
        }
        summed_quantities(&draft.items)?;
        if Money::checked_sum(draft.items.iter().map(OrderItem::line_total)).is_none() {
            return Err(OrderError::AmountTooLarge {
                field: "items price",
            });
        }

        for (field, price) in [
            ("tax price", draft.tax_price),
            ("shipping price", draft.shipping_price),
            ("total price", draft.total_price),
        ] {
            if price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    field,
                    price: price.cents(),
                });
            }
        }

        if let Some(field) = draft.shipping_address.first_blank_field() {
            return Err(OrderError::IncompleteAddress { field });
        }

        if draft.payment_method.trim().is_empty() {
            return Err(OrderError::PaymentMethodRequired);
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id: customer.id,
            user_name: customer.name.clone(),
            user_email: customer.email.clone(),
            items: draft.items,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            payment_result: None,
            tax_price: draft.tax_price,
            shipping_price: draft.shipping_price,
            total_price: draft.total_price,
            delivery_type: draft.delivery_type,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

fn summed_quantities(items: &[OrderItem]) -> Result<Vec<(ProductId, u32)>, OrderError> {
    let mut totals: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());
    for item in items {
        match totals.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((product_id, qty)) => {
                *qty = qty
                    .checked_add(item.qty)
                    .ok_or(OrderError::QuantityTooLarge {
                        product_id: *product_id,
                    })?;
            }
            None => totals.push((item.product_id, item.qty)),
        }
    }
    Ok(totals)
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the user who placed the order.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn user_email(&self) -> &str {
        &self.user_email
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the units requested per product, summed over duplicate lines.
    ///
    /// Fails if a product's total does not fit in a `u32`.
    pub fn quantities_by_product(&self) -> Result<Vec<(ProductId, u32)>, OrderError> {
        summed_quantities(&self.items)
    }

    /// Returns the sum of the line totals, excluding tax and shipping.
    pub fn items_price(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn payment_result(&self) -> Option<&PaymentResult> {
        self.payment_result.as_ref()
    }

    pub fn tax_price(&self) -> Money {
        self.tax_price
    }

    pub fn shipping_price(&self) -> Money {
        self.shipping_price
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn delivery_type(&self) -> Option<&str> {
        self.delivery_type.as_deref()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_delivered(&self) -> bool {
        self.is_delivered
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// Status transitions
impl Order {
    /// Fails unless the requester owns the order or is an administrator.
    pub fn ensure_visible_to(&self, requester: &Requester) -> Result<(), OrderError> {
        if !requester.is_owner_or_admin(self.user_id) {
            return Err(OrderError::NotPermitted { action: "view" });
        }
        Ok(())
    }

    /// Marks the order as paid by its owner or an administrator.
    ///
    /// Paying again overwrites `paid_at` and the payment result; `is_paid`
    /// stays true.
    pub fn mark_paid(
        &mut self,
        requester: &Requester,
        payment_result: PaymentResult,
    ) -> Result<(), OrderError> {
        if !requester.is_owner_or_admin(self.user_id) {
            return Err(OrderError::NotPermitted {
                action: "mark as paid",
            });
        }

        let now = Utc::now();
        self.is_paid = true;
        self.paid_at = Some(now);
        self.payment_result = Some(payment_result);
        self.updated_at = now;
        Ok(())
    }

    /// Marks the order as delivered. Administrators only.
    pub fn mark_delivered(&mut self, requester: &Requester) -> Result<(), OrderError> {
        if !requester.is_admin {
            return Err(OrderError::NotPermitted {
                action: "mark as delivered",
            });
        }

        let now = Utc::now();
        self.is_delivered = true;
        self.delivered_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Folds the status of `update` into this order.
    ///
    /// A flag set on either side stays set, and the newer timestamp (with
    /// its payment result) wins. Nothing but the status fields is read from
    /// `update`.
    pub fn merge_status(&mut self, update: &Order) {
        if update.is_paid && update.paid_at > self.paid_at {
            self.is_paid = true;
            self.paid_at = update.paid_at;
            self.payment_result = update.payment_result.clone();
        }
        if update.is_delivered && update.delivered_at > self.delivered_at {
            self.is_delivered = true;
            self.delivered_at = update.delivered_at;
        }
        self.updated_at = self.updated_at.max(update.updated_at);
    }
}
