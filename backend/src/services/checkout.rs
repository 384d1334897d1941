//! Cart checkout and hosted payment hand-off

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{CartItem, Order, User, DELIVERY_PRODUCT_NAME};

use crate::error::{AppError, AppResult};
use crate::external::wipay::{CreatePaymentRequest, WiPayClient};

/// Longest callback payload prefix written to the log
const CALLBACK_LOG_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_name: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResult {
    pub payment_url: String,
    pub order_ids: Vec<Uuid>,
    pub amount: Decimal,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    product_name: String,
    amount: Decimal,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            user_id: row.user_id,
            product_name: row.product_name,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

/// Turn a posted cart into payable order lines. Unpayable lines are skipped
/// and a positive cached delivery fee becomes its own line.
pub fn order_lines(cart: &[CartItem], delivery_fee: Option<f64>) -> Vec<OrderLine> {
    let mut lines: Vec<OrderLine> = cart
        .iter()
        .filter_map(|item| {
            item.payable_amount().map(|amount| OrderLine {
                product_name: item.product_name.trim().to_string(),
                amount,
            })
        })
        .collect();

    let fee = delivery_fee
        .filter(|f| f.is_finite() && *f > 0.0)
        .and_then(|f| Decimal::try_from(f).ok())
        .map(|f| f.round_dp(2))
        .filter(|f| *f > Decimal::ZERO);
    if let Some(amount) = fee {
        lines.push(OrderLine {
            product_name: DELIVERY_PRODUCT_NAME.to_string(),
            amount,
        });
    }
    lines
}

/// Acknowledge a gateway callback. The body must be JSON; it is only logged.
pub fn acknowledge_callback(body: &str) -> AppResult<Value> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|_| AppError::ValidationError("Invalid JSON".into()))?;
    let logged: String = payload.to_string().chars().take(CALLBACK_LOG_LIMIT).collect();
    tracing::info!("Payment callback: {}", logged);
    Ok(serde_json::json!({"status": "success"}))
}

pub struct CheckoutService {
    db: PgPool,
    public_url: String,
}

impl CheckoutService {
    pub fn new(db: PgPool, public_url: &str) -> Self {
        Self {
            db,
            public_url: public_url.to_string(),
        }
    }

    /// Persist the cart as orders, then start a hosted payment for the total
    pub async fn checkout(
        &self,
        user: &User,
        cart: &[CartItem],
        gateway: &WiPayClient,
    ) -> AppResult<CheckoutResult> {
        if cart.is_empty() {
            return Err(AppError::ValidationError("Your cart is empty.".into()));
        }
        let lines = order_lines(cart, user.delivery_fee);
        if lines.is_empty() {
            return Err(AppError::ValidationError("No payable items in your cart.".into()));
        }
        let amount: Decimal = lines.iter().map(|l| l.amount).sum();

        let mut tx = self.db.begin().await?;
        let mut order_ids = Vec::with_capacity(lines.len());
        for line in &lines {
            let order = sqlx::query_as::<_, OrderRow>(
                r#"
                INSERT INTO orders (user_id, product_name, amount)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, product_name, amount, created_at
                "#,
            )
            .bind(user.id)
            .bind(&line.product_name)
            .bind(line.amount)
            .fetch_one(&mut *tx)
            .await?;
            order_ids.push(order.id);
        }
        tx.commit().await?;

        let Some(last_order) = order_ids.last() else {
            return Err(AppError::Internal("checkout stored no orders".into()));
        };
        tracing::info!(
            "Checkout for {}: {} orders, total {}",
            user.id,
            order_ids.len(),
            amount
        );

        let request = CreatePaymentRequest::new(&last_order.to_string(), amount, &self.public_url);
        let payment_url = gateway.create_payment(&request).await?;

        Ok(CheckoutResult {
            payment_url,
            order_ids,
            amount,
        })
    }

    /// Orders placed by a user, newest first
    pub async fn list_orders(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, product_name, amount, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }
}
