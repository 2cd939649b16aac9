use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::product::{
    AgeGroup, CategoryStats, Gender, NewProduct, Product, ProductAttribute, ProductFilter,
    ProductImage, ProductOverview, ProductStats,
};
use crate::models::response::PageParams;

const PRODUCT_COLUMNS: &str = "id, name, product_type, category, subcategory, gender, \
    target_age_group, description, tags, brand, collection, colors, sizes, attributes, \
    price, stock, images, created_at, updated_at";

/// Distinct-value listings exposed under `/products/metadata/{field}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MetadataField {
    Brands,
    Collections,
    Colors,
    Sizes,
}

fn decode_err<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    let gender: String = row.try_get("gender")?;
    let age_group: String = row.try_get("target_age_group")?;
    let Json(attributes): Json<Vec<ProductAttribute>> = row.try_get("attributes")?;
    let Json(images): Json<Vec<ProductImage>> = row.try_get("images")?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        product_type: row.try_get("product_type")?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        gender: Gender::from_str(&gender).map_err(decode_err)?,
        target_age_group: AgeGroup::from_str(&age_group).map_err(decode_err)?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        brand: row.try_get("brand")?,
        collection: row.try_get("collection")?,
        colors: row.try_get("colors")?,
        sizes: row.try_get("sizes")?,
        attributes,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        images,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_product<'e, E>(executor: E, product: &NewProduct) -> Result<Product, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO products (name, product_type, category, subcategory, gender,
                              target_age_group, description, tags, brand, collection,
                              colors, sizes, attributes, price, stock, images)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&product.name)
    .bind(&product.product_type)
    .bind(&product.category)
    .bind(&product.subcategory)
    .bind(product.gender.to_string())
    .bind(product.target_age_group.to_string())
    .bind(&product.description)
    .bind(&product.tags)
    .bind(&product.brand)
    .bind(&product.collection)
    .bind(&product.colors)
    .bind(&product.sizes)
    .bind(Json(&product.attributes))
    .bind(product.price)
    .bind(product.stock)
    .bind(Json(&product.images))
    .fetch_one(executor)
    .await?;

    product_from_row(&row)
}

/// Insert a new product
pub async fn create_product(pool: &PgPool, product: &NewProduct) -> Result<Product, sqlx::Error> {
    insert_product(pool, product).await
}

/// Insert several products atomically; any failure rolls back the batch.
pub async fn create_products(
    pool: &PgPool,
    products: &[NewProduct],
) -> Result<Vec<Product>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(products.len());
    for product in products {
        created.push(insert_product(&mut *tx, product).await?);
    }
    tx.commit().await?;
    Ok(created)
}

/// Get a product by ID
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(product_from_row).transpose()
}

/// Replace every writable field of a product
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    product: &NewProduct,
) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE products
        SET name = $2, product_type = $3, category = $4, subcategory = $5, gender = $6,
            target_age_group = $7, description = $8, tags = $9, brand = $10,
            collection = $11, colors = $12, sizes = $13, attributes = $14, price = $15,
            stock = $16, images = $17
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&product.name)
    .bind(&product.product_type)
    .bind(&product.category)
    .bind(&product.subcategory)
    .bind(product.gender.to_string())
    .bind(product.target_age_group.to_string())
    .bind(&product.description)
    .bind(&product.tags)
    .bind(&product.brand)
    .bind(&product.collection)
    .bind(&product.colors)
    .bind(&product.sizes)
    .bind(Json(&product.attributes))
    .bind(product.price)
    .bind(product.stock)
    .bind(Json(&product.images))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(product_from_row).transpose()
}

/// Delete a product, returning it when it existed
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(product_from_row).transpose()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Append a WHERE clause for every populated filter.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");

    if let Some(search) = non_blank(&filter.search) {
        qb.push(
            " AND (to_tsvector('english', name || ' ' || description) @@ plainto_tsquery('english', ",
        );
        qb.push_bind(search.clone());
        qb.push(") OR ");
        qb.push_bind(search);
        qb.push(" = ANY(tags))");
    }

    let exact = [
        ("category", &filter.category),
        ("subcategory", &filter.subcategory),
        ("gender", &filter.gender),
        ("product_type", &filter.product_type),
        ("brand", &filter.brand),
        ("collection", &filter.collection),
    ];
    for (column, value) in exact {
        if let Some(value) = non_blank(value) {
            qb.push(format!(" AND {column} = "));
            qb.push_bind(value);
        }
    }

    for (column, value) in [("colors", &filter.color), ("sizes", &filter.size)] {
        if let Some(value) = non_blank(value) {
            qb.push(" AND ");
            qb.push_bind(value);
            qb.push(format!(" = ANY({column})"));
        }
    }

    if let Some(min) = filter.min_price {
        qb.push(" AND price >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price <= ");
        qb.push_bind(max);
    }
}

/// List products matching a filter, newest first, with the total match count
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
    page: PageParams,
) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_filters(&mut query, filter);
    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(page.limit());
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows = query.build().fetch_all(pool).await?;
    let products = rows
        .iter()
        .map(product_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((products, total))
}

/// Number of the given ids that exist in the catalog
pub async fn count_existing(pool: &PgPool, ids: &[Uuid]) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_one(pool)
        .await
}

/// Catalog-wide totals plus a per-category breakdown
pub async fn product_stats(pool: &PgPool) -> Result<ProductStats, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*)                                          AS total_products,
               COALESCE(ROUND(SUM(price)::numeric, 2), 0)::float8 AS total_value,
               COALESCE(ROUND(AVG(price)::numeric, 2), 0)::float8 AS avg_price,
               COALESCE(SUM(stock), 0)::bigint                   AS total_stock
        FROM products
        "#,
    )
    .fetch_one(pool)
    .await?;

    let overview = ProductOverview {
        total_products: row.try_get("total_products")?,
        total_value: row.try_get("total_value")?,
        avg_price: row.try_get("avg_price")?,
        total_stock: row.try_get("total_stock")?,
    };

    let rows = sqlx::query(
        r#"
        SELECT category,
               COUNT(*)                                          AS count,
               COALESCE(ROUND(AVG(price)::numeric, 2), 0)::float8 AS avg_price,
               COALESCE(SUM(stock), 0)::bigint                   AS total_stock
        FROM products
        GROUP BY category
        ORDER BY category
        "#,
    )
    .fetch_all(pool)
    .await?;

    let category_breakdown = rows
        .into_iter()
        .map(|r| {
            Ok(CategoryStats {
                category: r.try_get("category")?,
                count: r.try_get("count")?,
                avg_price: r.try_get("avg_price")?,
                total_stock: r.try_get("total_stock")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(ProductStats {
        overview,
        category_breakdown,
    })
}

/// Sorted distinct non-empty values of a product field
pub async fn distinct_values(
    pool: &PgPool,
    field: MetadataField,
) -> Result<Vec<String>, sqlx::Error> {
    let sql = match field {
        MetadataField::Brands => {
            "SELECT DISTINCT brand FROM products WHERE brand IS NOT NULL AND trim(brand) <> '' ORDER BY 1"
        }
        MetadataField::Collections => {
            "SELECT DISTINCT collection FROM products \
             WHERE collection IS NOT NULL AND trim(collection) <> '' ORDER BY 1"
        }
        MetadataField::Colors => {
            "SELECT DISTINCT c FROM products, unnest(colors) AS c WHERE trim(c) <> '' ORDER BY 1"
        }
        MetadataField::Sizes => {
            "SELECT DISTINCT s FROM products, unnest(sizes) AS s WHERE trim(s) <> '' ORDER BY 1"
        }
    };

    sqlx::query_scalar(sql).fetch_all(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_field_parsing() {
        assert_eq!(MetadataField::from_str("colors").unwrap(), MetadataField::Colors);
        assert_eq!(MetadataField::Brands.to_string(), "brands");
        assert!(MetadataField::from_str("prices").is_err());
    }

    #[test]
    fn test_filters_render_only_populated_fields() {
        let filter = ProductFilter {
            category: Some("Clothing".to_string()),
            brand: Some("  ".to_string()),
            color: Some("Red".to_string()),
            min_price: Some(5.0),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("category = $1"));
        assert!(sql.contains("$2 = ANY(colors)"));
        assert!(sql.contains("price >= $3"));
        assert!(!sql.contains("brand"));
    }

    #[test]
    fn test_search_matches_text_or_tag() {
        let filter = ProductFilter {
            search: Some("linen".to_string()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("plainto_tsquery('english', $1)"));
        assert!(sql.contains("$2 = ANY(tags)"));
    }
}
