//! PostgreSQL 订单 Repository 实现

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commercium_adapter_postgres::{map_sqlx_error, timed};
use commercium_common::{OrderId, OrderItemId, ProductId, SellerId, UserId};
use commercium_domain_core::Decimal;
use commercium_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::order::domain::{Order, OrderItem, OrderRepository, OrderStatus, ShippingAddress};

const ORDER_COLUMNS: &str = r#"
    id, user_id, order_number, status, recipient_name, phone, zip_code, address1, address2,
    total_amount, created_at, updated_at
"#;

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 批量加载明细并组装聚合
    async fn hydrate(&self, rows: Vec<OrderRow>) -> AppResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, seller_id, product_name, quantity, unit_price, total_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY line_no
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to load order items", e))?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row.into_item()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn fetch_orders(
        &self,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, OrderRow, sqlx::postgres::PgArguments>,
    ) -> AppResult<Vec<Order>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to query orders", e))?;
        self.hydrate(rows).await
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn save(&self, order: &Order) -> AppResult<()> {
        timed("upsert", "orders", async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

            sqlx::query(
                r#"
                INSERT INTO orders (id, user_id, order_number, status, recipient_name, phone, zip_code,
                                    address1, address2, total_amount, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    total_amount = EXCLUDED.total_amount,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(order.user_id.as_str())
            .bind(&order.order_number)
            .bind(order.status.as_str())
            .bind(&order.shipping_address.recipient_name)
            .bind(&order.shipping_address.phone)
            .bind(&order.shipping_address.zip_code)
            .bind(&order.shipping_address.address1)
            .bind(&order.shipping_address.address2)
            .bind(order.total_amount)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to save order", e))?;

            for (line_no, item) in order.items.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_items (id, order_id, line_no, product_id, seller_id, product_name,
                                             quantity, unit_price, total_price)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (id) DO NOTHING
                    "#,
                )
                .bind(item.id.as_uuid())
                .bind(order.id.as_uuid())
                .bind(line_no as i32)
                .bind(item.product_id.as_str())
                .bind(item.seller_id.as_str())
                .bind(&item.product_name)
                .bind(item.quantity)
                .bind(item.unit_price)
                .bind(item.total_price)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to save order item", e))?;
            }

            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("Failed to commit order", e))
        })
        .await
    }

    async fn find_by_id(&self, id: &OrderId) -> AppResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let orders = timed(
            "select",
            "orders",
            self.fetch_orders(sqlx::query_as(&sql).bind(id.as_uuid())),
        )
        .await?;
        Ok(orders.into_iter().next())
    }

    async fn find_by_order_number(&self, order_number: &str) -> AppResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE order_number = $1", ORDER_COLUMNS);
        let orders = self
            .fetch_orders(sqlx::query_as(&sql).bind(order_number))
            .await?;
        Ok(orders.into_iter().next())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> AppResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        timed(
            "select",
            "orders",
            self.fetch_orders(sqlx::query_as(&sql).bind(user_id.as_str())),
        )
        .await
    }

    async fn find_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        self.fetch_orders(
            sqlx::query_as(&sql)
                .bind(user_id.as_str())
                .bind(status.as_str()),
        )
        .await
    }

    async fn find_by_status_and_created_between(
        &self,
        status: OrderStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE status = $1 AND created_at BETWEEN $2 AND $3 ORDER BY created_at",
            ORDER_COLUMNS
        );
        self.fetch_orders(
            sqlx::query_as(&sql)
                .bind(status.as_str())
                .bind(from)
                .bind(to),
        )
        .await
    }

    async fn find_settleable_by_seller_between(
        &self,
        seller_id: &SellerId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {} FROM orders o
            WHERE o.status IN ('PAID', 'PREPARING', 'SHIPPED', 'DELIVERED')
              AND o.created_at BETWEEN $2 AND $3
              AND EXISTS (SELECT 1 FROM order_items i WHERE i.order_id = o.id AND i.seller_id = $1)
            ORDER BY o.created_at
            "#,
            ORDER_COLUMNS
        );
        timed(
            "select",
            "orders",
            self.fetch_orders(
                sqlx::query_as(&sql)
                    .bind(seller_id.as_str())
                    .bind(from)
                    .bind(to),
            ),
        )
        .await
    }

    async fn find_sellers_with_sales_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<SellerId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT i.seller_id
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.status IN ('PAID', 'PREPARING', 'SHIPPED', 'DELIVERED')
              AND o.created_at BETWEEN $1 AND $2
            ORDER BY i.seller_id
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to query sellers", e))?;

        rows.into_iter()
            .map(|(seller,)| SellerId::parse(seller).map_err(AppError::internal))
            .collect()
    }

    async fn count_by_user_id_and_status(
        &self,
        user_id: &UserId,
        status: OrderStatus,
    ) -> AppResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = $2")
                .bind(user_id.as_str())
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("Failed to count orders", e))?;
        Ok(count)
    }

    async fn delete(&self, id: &OrderId) -> AppResult<()> {
        // order_items 通过 ON DELETE CASCADE 删除
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete order", e))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    order_number: String,
    status: String,
    recipient_name: String,
    phone: String,
    zip_code: String,
    address1: String,
    address2: Option<String>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> AppResult<Order> {
        Ok(Order::restore(
            OrderId::from_uuid(self.id),
            UserId::parse(self.user_id).map_err(AppError::internal)?,
            self.order_number,
            self.status.parse::<OrderStatus>()?,
            items,
            ShippingAddress {
                recipient_name: self.recipient_name,
                phone: self.phone,
                zip_code: self.zip_code,
                address1: self.address1,
                address2: self.address2,
            },
            self.total_amount,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: String,
    seller_id: String,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

impl OrderItemRow {
    fn into_item(self) -> AppResult<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(self.id),
            product_id: ProductId::parse(self.product_id).map_err(AppError::internal)?,
            seller_id: SellerId::parse(self.seller_id).map_err(AppError::internal)?,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.total_price,
        })
    }
}
