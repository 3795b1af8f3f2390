// ==========================================
// 库存 CSV 导入 - 默认字段映射规则
// ==========================================
// 职责: 库存 schema 的静态规则表（英/西双语列名模式）
// 说明: 规则顺序即映射器平分时的优先顺序
// ==========================================

use crate::domain::field::{FieldMappingRule, FieldTransform, FieldValidator, InventoryField};
use crate::domain::types::DataType;

fn rule(
    field: InventoryField,
    patterns: &[&str],
    weight: f64,
    data_type: DataType,
    required: bool,
    validator: FieldValidator,
    transform: Option<FieldTransform>,
) -> FieldMappingRule {
    FieldMappingRule {
        field,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        weight,
        data_type,
        required,
        validator,
        transform,
    }
}

/// 默认库存字段映射规则
pub fn default_field_rules() -> Vec<FieldMappingRule> {
    vec![
        rule(
            InventoryField::Sku,
            &[
                "sku", "codigo", "código", "code", "item code", "product code",
                "codigo producto", "referencia", "ref", "part number", "numero de parte",
            ],
            1.0,
            DataType::Text,
            true,
            FieldValidator::Code { max_len: 50 },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Name,
            &[
                "name", "nombre", "product name", "nombre producto", "producto", "product",
                "item", "articulo", "artículo",
            ],
            1.0,
            DataType::Text,
            true,
            FieldValidator::Name {
                max_len: 200,
                warn_below: 2,
            },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Description,
            &["description", "descripcion", "descripción", "detalle", "detalles", "details"],
            0.8,
            DataType::Text,
            false,
            FieldValidator::Text {
                max_len: Some(1000),
            },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Category,
            &[
                "category", "categoria", "categoría", "tipo", "type", "clase", "familia",
                "grupo", "group",
            ],
            0.85,
            DataType::Text,
            false,
            FieldValidator::Text { max_len: Some(100) },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Location,
            &[
                "location", "ubicacion", "ubicación", "almacen", "almacén", "warehouse",
                "bodega", "lugar", "estante", "shelf",
            ],
            0.85,
            DataType::Text,
            false,
            FieldValidator::Text { max_len: Some(100) },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Price,
            &[
                "price", "precio", "unit price", "precio unitario", "precio venta",
                "sale price", "pvp",
            ],
            0.9,
            DataType::Numeric,
            false,
            FieldValidator::Money {
                warn_above: Some(1_000_000.0),
            },
            Some(FieldTransform::Money),
        ),
        rule(
            InventoryField::Cost,
            &[
                "cost", "costo", "coste", "unit cost", "costo unitario", "precio compra",
                "purchase price",
            ],
            0.85,
            DataType::Numeric,
            false,
            FieldValidator::Money { warn_above: None },
            Some(FieldTransform::Money),
        ),
        rule(
            InventoryField::Quantity,
            &[
                "quantity", "cantidad", "qty", "stock", "existencias", "inventario",
                "unidades", "units",
            ],
            0.9,
            DataType::Numeric,
            false,
            FieldValidator::Count {
                warn_above: Some(100_000),
            },
            Some(FieldTransform::Integer),
        ),
        rule(
            InventoryField::MinStock,
            &[
                "min stock", "minimum stock", "stock min", "stock minimo", "stock mínimo",
                "minimo", "mínimo", "reorder point", "punto de reorden",
            ],
            0.8,
            DataType::Numeric,
            false,
            FieldValidator::Count { warn_above: None },
            Some(FieldTransform::Integer),
        ),
        rule(
            InventoryField::MaxStock,
            &[
                "max stock", "maximum stock", "stock max", "stock maximo", "stock máximo",
                "maximo", "máximo",
            ],
            0.8,
            DataType::Numeric,
            false,
            FieldValidator::Count { warn_above: None },
            Some(FieldTransform::Integer),
        ),
        rule(
            InventoryField::Status,
            &["status", "estado", "state", "estatus"],
            0.8,
            DataType::Text,
            false,
            FieldValidator::Status,
            Some(FieldTransform::Status),
        ),
        rule(
            InventoryField::Barcode,
            &[
                "barcode", "codigo de barras", "código de barras", "ean", "upc", "gtin",
            ],
            0.85,
            DataType::Numeric,
            false,
            FieldValidator::Barcode {
                min_len: 8,
                max_len: 14,
            },
            Some(FieldTransform::Barcode),
        ),
        rule(
            InventoryField::Supplier,
            &[
                "supplier", "proveedor", "nombre proveedor", "vendor", "fabricante",
                "manufacturer", "marca", "brand",
            ],
            0.75,
            DataType::Text,
            false,
            FieldValidator::Text { max_len: Some(200) },
            Some(FieldTransform::Trim),
        ),
        rule(
            InventoryField::Tags,
            &["tags", "etiquetas", "labels", "keywords", "palabras clave"],
            0.7,
            DataType::Text,
            false,
            FieldValidator::TagList,
            None,
        ),
        rule(
            InventoryField::Notes,
            &["notes", "notas", "observaciones", "comments", "comentarios", "remarks"],
            0.7,
            DataType::Text,
            false,
            FieldValidator::Text { max_len: None },
            Some(FieldTransform::Trim),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_rules_cover_every_field_once() {
        let rules = default_field_rules();
        let fields: HashSet<_> = rules.iter().map(|r| r.field).collect();
        assert_eq!(fields.len(), rules.len());
        assert_eq!(fields.len(), InventoryField::ALL.len());
    }

    #[test]
    fn test_only_sku_and_name_required() {
        let required: Vec<_> = default_field_rules()
            .into_iter()
            .filter(|r| r.required)
            .map(|r| r.field)
            .collect();
        assert_eq!(required, vec![InventoryField::Sku, InventoryField::Name]);
    }

    #[test]
    fn test_weights_in_unit_range() {
        for rule in default_field_rules() {
            assert!(rule.weight > 0.0 && rule.weight <= 1.0, "{}", rule.field);
        }
    }
}
