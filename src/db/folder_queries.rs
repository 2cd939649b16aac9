use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::db::escape_like;
use crate::models::folder::{dedup_ids, Folder, ProductSummary};
use crate::models::product::ProductImage;
use crate::models::response::PageParams;

struct FolderRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn folder_row(row: &PgRow) -> Result<FolderRow, sqlx::Error> {
    Ok(FolderRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Load product summaries for the given folders, in membership order.
async fn load_products(
    pool: &PgPool,
    folder_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<ProductSummary>>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT fp.folder_id, p.id, p.name, p.price, p.images
        FROM folder_products fp
        JOIN products p ON p.id = fp.product_id
        WHERE fp.folder_id = ANY($1)
        ORDER BY fp.position
        "#,
    )
    .bind(folder_ids)
    .fetch_all(pool)
    .await?;

    let mut by_folder: HashMap<Uuid, Vec<ProductSummary>> = HashMap::new();
    for row in rows {
        let folder_id: Uuid = row.try_get("folder_id")?;
        let Json(images): Json<Vec<ProductImage>> = row.try_get("images")?;
        by_folder.entry(folder_id).or_default().push(ProductSummary {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            images,
        });
    }
    Ok(by_folder)
}

async fn populate(pool: &PgPool, rows: Vec<FolderRow>) -> Result<Vec<Folder>, sqlx::Error> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut products = load_products(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let products = products.remove(&row.id).unwrap_or_default();
            Folder {
                id: row.id,
                name: row.name,
                product_count: products.len(),
                products,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect())
}

async fn insert_members<'e, E>(executor: E, folder_id: Uuid, product_ids: &[Uuid]) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let ids = dedup_ids(product_ids);
    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO folder_products (folder_id, product_id)
        SELECT $1, member.id
        FROM unnest($2::uuid[]) WITH ORDINALITY AS member(id, ord)
        ORDER BY member.ord
        ON CONFLICT (folder_id, product_id) DO NOTHING
        "#,
    )
    .bind(folder_id)
    .bind(&ids)
    .execute(executor)
    .await?;

    Ok(())
}

/// Create a folder with an initial set of products
pub async fn create_folder(
    pool: &PgPool,
    name: &str,
    product_ids: &[Uuid],
) -> Result<Folder, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let id: Uuid = sqlx::query_scalar("INSERT INTO folders (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
    insert_members(&mut *tx, id, product_ids).await?;

    tx.commit().await?;

    get_folder(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// List folders newest first, optionally filtered by a name substring
pub async fn list_folders(
    pool: &PgPool,
    search: Option<&str>,
    page: PageParams,
) -> Result<(Vec<Folder>, i64), sqlx::Error> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let rows = sqlx::query(
        r#"
        SELECT id, name, created_at, updated_at
        FROM folders
        WHERE $1::text IS NULL OR name ILIKE $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&pattern)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE $1::text IS NULL OR name ILIKE $1")
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

    let rows = rows.iter().map(folder_row).collect::<Result<Vec<_>, _>>()?;
    Ok((populate(pool, rows).await?, total))
}

/// Get a folder with its products
pub async fn get_folder(pool: &PgPool, id: Uuid) -> Result<Option<Folder>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name, created_at, updated_at FROM folders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(populate(pool, vec![folder_row(&row)?]).await?.pop()),
        None => Ok(None),
    }
}

/// Rename a folder and/or replace its membership
pub async fn update_folder(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    product_ids: Option<&[Uuid]>,
) -> Result<Option<Folder>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated: Option<Uuid> = sqlx::query_scalar(
        "UPDATE folders SET name = COALESCE($2, name), updated_at = NOW() WHERE id = $1 RETURNING id",
    )
    .bind(id)
    .bind(name)
    .fetch_optional(&mut *tx)
    .await?;

    if updated.is_none() {
        return Ok(None);
    }

    if let Some(product_ids) = product_ids {
        sqlx::query("DELETE FROM folder_products WHERE folder_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_members(&mut *tx, id, product_ids).await?;
    }

    tx.commit().await?;
    get_folder(pool, id).await
}

/// Delete a folder; its memberships cascade
pub async fn delete_folder(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM folders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Append products to a folder, ignoring ones already present
pub async fn add_products(
    pool: &PgPool,
    id: Uuid,
    product_ids: &[Uuid],
) -> Result<Option<Folder>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let touched: Option<Uuid> =
        sqlx::query_scalar("UPDATE folders SET updated_at = NOW() WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if touched.is_none() {
        return Ok(None);
    }

    insert_members(&mut *tx, id, product_ids).await?;
    tx.commit().await?;

    get_folder(pool, id).await
}

/// Remove products from a folder
pub async fn remove_products(
    pool: &PgPool,
    id: Uuid,
    product_ids: &[Uuid],
) -> Result<Option<Folder>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let touched: Option<Uuid> =
        sqlx::query_scalar("UPDATE folders SET updated_at = NOW() WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if touched.is_none() {
        return Ok(None);
    }

    sqlx::query("DELETE FROM folder_products WHERE folder_id = $1 AND product_id = ANY($2)")
        .bind(id)
        .bind(product_ids)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    get_folder(pool, id).await
}

/// Every folder containing the given product
pub async fn folders_by_product(pool: &PgPool, product_id: Uuid) -> Result<Vec<Folder>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT f.id, f.name, f.created_at, f.updated_at
        FROM folders f
        JOIN folder_products fp ON fp.folder_id = f.id
        WHERE fp.product_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    let rows = rows.iter().map(folder_row).collect::<Result<Vec<_>, _>>()?;
    populate(pool, rows).await
}
