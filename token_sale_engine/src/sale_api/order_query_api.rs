use std::fmt::Debug;

use crate::{
    db_types::{Order, Payment, UserId},
    sale_api::order_objects::{OrderQueryFilter, SalesSummary, UserOrder},
    traits::{OrderManagement, OrderQueryError},
};

/// Read-side access to orders and payments.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    /// Fetches an order by id. Callers validate the id format (it must parse as an integer)
    /// before this is ever reached.
    pub async fn order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError> {
        self.db.fetch_order_by_id(id).await
    }

    /// All of the user's orders, newest first, joined with payment and credit information.
    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<UserOrder>, OrderQueryError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// All orders placed in the given currency, newest first.
    pub async fn orders_for_currency(&self, currency: &str) -> Result<Vec<Order>, OrderQueryError> {
        self.db.search_orders(OrderQueryFilter::default().with_currency(currency)).await
    }

    /// Every order on the books, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderQueryError> {
        self.db.search_orders(OrderQueryFilter::default()).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        self.db.search_orders(query).await
    }

    pub async fn payments_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, OrderQueryError> {
        self.db.fetch_payments_for_user(user_id).await
    }

    pub async fn sales_summary(&self) -> Result<SalesSummary, OrderQueryError> {
        self.db.sales_summary().await
    }
}
