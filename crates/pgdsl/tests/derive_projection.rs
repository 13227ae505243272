//! Derived projections evaluated against the in-memory executor.

use pgdsl::prelude::*;
use pgdsl::{SelectItem, ValueKind};

struct QItem {
    table: TableRef,
    id: Column<i64>,
    label: Column<Option<String>>,
    qty: Column<i32>,
    price: Column<f64>,
}

impl QItem {
    fn new(alias: &str) -> Self {
        let table = TableRef::new("item", alias);
        Self {
            id: Column::new(&table, "id"),
            label: Column::new(&table, "label"),
            qty: Column::new(&table, "qty"),
            price: Column::new(&table, "price"),
            table,
        }
    }
}

impl EntityPath for QItem {
    type Entity = Record;

    fn table(&self) -> &TableRef {
        &self.table
    }

    fn columns(&self) -> Vec<SelectItem> {
        vec![
            self.id.item(),
            self.label.item(),
            self.qty.item(),
            self.price.item(),
        ]
    }

    fn decode(&self, record: &Record) -> Result<Record, ProjectionError> {
        Ok(record.clone())
    }
}

#[derive(Debug, PartialEq, FromRecord)]
struct LabelDto {
    #[dsl(column = "name")]
    label: Option<String>,
    qty: i32,
}

#[derive(Debug, PartialEq, FromArgs)]
struct LineDto {
    label: Option<String>,
    qty: i32,
    price: f64,
}

#[derive(Debug, PartialEq, FromArgs)]
struct Pair(Option<String>, i64);

async fn seeded() -> (MemoryStore, QItem) {
    let store = MemoryStore::new();
    store
        .create_table("item", "id", &["id", "label", "qty", "price"])
        .unwrap();
    let i = QItem::new("i");
    for (label, qty, price) in [
        (Some("bolt"), 10, 0.5),
        (Some("nut"), 20, 0.25),
        (None, 30, 2.0),
    ] {
        qb::insert_into(&i)
            .value(&i.label, label)
            .value(&i.qty, qty)
            .value(&i.price, price)
            .execute_returning(&store, &i.id)
            .await
            .unwrap();
    }
    (store, i)
}

#[tokio::test]
async fn fields_read_by_renamed_column() {
    let (store, i) = seeded().await;
    let rows: Vec<LabelDto> = qb::select(fields::<LabelDto>([
        i.label.as_("name").item(),
        i.qty.item(),
    ]))
    .from(&i)
    .where_(i.qty.loe(20))
    .order_by(i.qty.asc())
    .fetch(&store)
    .await
    .unwrap();

    assert_eq!(
        rows,
        vec![
            LabelDto {
                label: Some("bolt".into()),
                qty: 10
            },
            LabelDto {
                label: Some("nut".into()),
                qty: 20
            },
        ]
    );
}

#[tokio::test]
async fn fields_without_rename_report_missing_column() {
    let (store, i) = seeded().await;
    let err = qb::select(fields::<LabelDto>([i.label.item(), i.qty.item()]))
        .from(&i)
        .fetch(&store)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DslError::Projection(ProjectionError::MissingColumn { ref column }) if column == "name"
    ));
}

#[tokio::test]
async fn constructor_binds_in_declaration_order() {
    let (store, i) = seeded().await;
    let projection =
        constructor::<LineDto>([i.label.item(), i.qty.item(), i.price.item()]).unwrap();
    let rows = qb::select(projection)
        .from(&i)
        .order_by(i.qty.desc())
        .fetch(&store)
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        LineDto {
            label: None,
            qty: 30,
            price: 2.0
        }
    );
}

#[test]
fn derived_arity_and_kinds() {
    assert_eq!(LineDto::ARITY, 3);
    assert_eq!(
        LineDto::arg_kinds(),
        vec![ValueKind::Text, ValueKind::Int, ValueKind::Double]
    );
    assert_eq!(Pair::ARITY, 2);
}

#[test]
fn constructor_rejects_short_argument_list() {
    let i = QItem::new("i");
    let err = constructor::<LineDto>([i.label.item(), i.qty.item()]).unwrap_err();
    assert_eq!(err, ProjectionError::MissingArgument { position: 2 });
}

#[test]
fn constructor_rejects_wrong_kind() {
    let i = QItem::new("i");
    let err = constructor::<Pair>([i.label.item(), i.label.item()]).unwrap_err();
    assert!(matches!(err, ProjectionError::TypeMismatch { .. }));
}

#[tokio::test]
async fn tuple_struct_binds_positionally() {
    let (store, i) = seeded().await;
    let rows = qb::select(constructor::<Pair>([i.label.item(), i.id.item()]).unwrap())
        .from(&i)
        .where_(i.label.is_not_null())
        .order_by(i.id.asc())
        .fetch(&store)
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![Pair(Some("bolt".into()), 1), Pair(Some("nut".into()), 2)]
    );
}
