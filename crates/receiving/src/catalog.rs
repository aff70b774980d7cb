//! External collaborators the engine reads from.
//!
//! The product catalog, purchase-order store and department directory live
//! outside this crate. Callers resolve what they need through these traits
//! before building a command, so the receipt aggregate itself never does IO.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardstock_core::{
    DepartmentId, ManufacturerId, PoDetailId, ProductId, PurchaseOrderId,
};

use crate::line::LineDiscount;

/// Split GST rates applied to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxProfile {
    pub cgst_percent: Decimal,
    pub sgst_percent: Decimal,
}

/// What the catalog knows about a product when it is added by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub pack_size: Decimal,
    pub manufacturer_id: Option<ManufacturerId>,
    #[serde(default)]
    pub tax: TaxProfile,
    #[serde(default)]
    pub expiry_tracked: bool,
}

/// Short reference to the purchase order a receipt was raised against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderRef {
    pub id: PurchaseOrderId,
    pub code: String,
}

/// One contracted line of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub detail_id: PoDetailId,
    pub product_id: ProductId,
    pub name: String,
    pub required_qty: Decimal,
    pub unit_price: Decimal,
    pub pack_size: Decimal,
    #[serde(default)]
    pub discount: LineDiscount,
    #[serde(default)]
    pub tax: TaxProfile,
    #[serde(default = "default_tax_after_discount")]
    pub tax_after_discount: bool,
    #[serde(default)]
    pub expiry_tracked: bool,
}

fn default_tax_after_discount() -> bool {
    true
}

/// Purchase order header plus its ordered detail lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderSnapshot {
    pub id: PurchaseOrderId,
    pub code: String,
    pub order_date: NaiveDate,
    pub total_amount: Decimal,
    pub lines: Vec<PurchaseOrderLine>,
}

impl PurchaseOrderSnapshot {
    pub fn reference(&self) -> PurchaseOrderRef {
        PurchaseOrderRef {
            id: self.id,
            code: self.code.clone(),
        }
    }
}

/// Product master lookup.
pub trait ProductCatalog {
    fn lookup(&self, product_id: ProductId) -> Option<CatalogEntry>;
}

/// Purchase order lookup.
pub trait PurchaseOrderSource {
    fn fetch(&self, order_id: PurchaseOrderId) -> Option<PurchaseOrderSnapshot>;
}

/// Department id → display name.
pub trait DepartmentDirectory {
    fn name(&self, department_id: DepartmentId) -> Option<String>;

    /// Display name, falling back to the raw id.
    fn label(&self, department_id: DepartmentId) -> String {
        self.name(department_id)
            .unwrap_or_else(|| format!("department {department_id}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    entries: HashMap<ProductId, CatalogEntry>,
}

impl InMemoryProductCatalog {
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.product_id, e)).collect(),
        }
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn lookup(&self, product_id: ProductId) -> Option<CatalogEntry> {
        self.entries.get(&product_id).cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchaseOrders {
    orders: HashMap<PurchaseOrderId, PurchaseOrderSnapshot>,
}

impl InMemoryPurchaseOrders {
    pub fn new(orders: impl IntoIterator<Item = PurchaseOrderSnapshot>) -> Self {
        Self {
            orders: orders.into_iter().map(|o| (o.id, o)).collect(),
        }
    }
}

impl PurchaseOrderSource for InMemoryPurchaseOrders {
    fn fetch(&self, order_id: PurchaseOrderId) -> Option<PurchaseOrderSnapshot> {
        self.orders.get(&order_id).cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDepartments {
    names: HashMap<DepartmentId, String>,
}

impl InMemoryDepartments {
    pub fn new(names: impl IntoIterator<Item = (DepartmentId, String)>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

impl DepartmentDirectory for InMemoryDepartments {
    fn name(&self, department_id: DepartmentId) -> Option<String> {
        self.names.get(&department_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn directory_label_falls_back_to_id() {
        let dir = InMemoryDepartments::new([(DepartmentId(3), "ICU".to_string())]);
        assert_eq!(dir.label(DepartmentId(3)), "ICU");
        assert_eq!(dir.label(DepartmentId(9)), "department 9");
    }

    #[test]
    fn purchase_order_line_defaults_to_tax_after_discount() {
        let json = r#"{
            "detail_id": 11,
            "product_id": 5,
            "name": "Saline 500ml",
            "required_qty": "20",
            "unit_price": "32.50",
            "pack_size": "1"
        }"#;
        let line: PurchaseOrderLine = serde_json::from_str(json).unwrap();
        assert!(line.tax_after_discount);
        assert_eq!(line.discount, LineDiscount::None);
        assert_eq!(line.unit_price, dec!(32.50));
    }

    #[test]
    fn catalog_lookup_returns_owned_entry() {
        let catalog = InMemoryProductCatalog::new([CatalogEntry {
            product_id: ProductId(1),
            name: "Gauze".into(),
            unit_price: dec!(4),
            pack_size: dec!(10),
            manufacturer_id: None,
            tax: TaxProfile::default(),
            expiry_tracked: false,
        }]);
        assert_eq!(catalog.lookup(ProductId(1)).unwrap().name, "Gauze");
        assert!(catalog.lookup(ProductId(2)).is_none());
    }
}
