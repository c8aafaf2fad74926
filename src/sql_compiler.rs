//! SQL compiler that turns a compiled [`Predicate`] into a sea-query
//! statement over the track store.

use crate::ast::DateField;
use crate::config::SchemaConfig;
use crate::predicate::{Bound, Predicate};
use sea_query::{
    Asterisk, Expr, Iden, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr, Values,
};

/// Table identifier taken from the schema config.
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier taken from the schema config.
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

fn table(name: &str) -> TableName {
    TableName(name.to_string())
}

/// Reference to a column qualified by its table.
fn column(table_name: &str, column: &str) -> (TableName, ColumnName) {
    (table(table_name), ColumnName(column.to_string()))
}

/// A column qualified by its table.
fn col(table_name: &str, column_name: &str) -> Expr {
    Expr::col(column(table_name, column_name))
}

/// Compiles predicates into SQL against a configured schema.
pub struct SqlCompiler {
    schema: SchemaConfig,
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new(SchemaConfig::default())
    }
}

impl SqlCompiler {
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    /// Selects a user's tracks, optionally filtered and limited.
    pub fn select_tracks(
        &self,
        predicate: Option<&Predicate>,
        user_id: i64,
        limit: Option<u64>,
    ) -> SelectStatement {
        let tracks = &self.schema.tracks;

        let mut select = Query::select();
        select
            .column((table(&tracks.table), Asterisk))
            .from(table(&tracks.table))
            .and_where(col(&tracks.table, &tracks.user_id).eq(user_id));

        if let Some(predicate) = predicate {
            select.and_where(self.condition(predicate));
        }
        if let Some(limit) = limit {
            select.limit(limit);
        }

        select
    }

    /// Renders a statement as PostgreSQL with values inlined.
    pub fn to_sql(&self, select: &SelectStatement) -> String {
        select.to_string(PostgresQueryBuilder)
    }

    /// Renders a statement as parameterized PostgreSQL.
    pub fn build(&self, select: &SelectStatement) -> (String, Values) {
        select.build(PostgresQueryBuilder)
    }

    /// Translates a predicate into a WHERE condition on the tracks table.
    pub fn condition(&self, predicate: &Predicate) -> SimpleExpr {
        let tracks = &self.schema.tracks;

        match predicate {
            Predicate::Clean => col(&tracks.table, &tracks.explicit).eq(false),
            Predicate::Explicit => col(&tracks.table, &tracks.explicit).eq(true),
            Predicate::Unlabeled => Expr::exists(self.track_labels(None)).not(),
            Predicate::Name(name) => col(&tracks.table, &tracks.name).eq(name.as_str()),
            Predicate::Label(name) => Expr::exists(self.track_labels(Some(name.as_str()))),
            Predicate::Artist(name) => Expr::exists(self.track_artists(name)),
            Predicate::Album(name) => {
                let albums = &self.schema.albums;
                self.album_where(col(&albums.table, &albums.name).eq(name.as_str()))
            }
            Predicate::Date { field: DateField::Added, bound } => {
                compare(col(&tracks.table, &tracks.date_added), bound)
            }
            Predicate::Date { field: DateField::Released, bound } => {
                let albums = &self.schema.albums;
                self.album_where(compare(col(&albums.table, &albums.release_date), bound))
            }
            Predicate::Not(inner) => self.condition(inner).not(),
            Predicate::And(left, right) => self.condition(left).and(self.condition(right)),
            Predicate::Or(left, right) => self.condition(left).or(self.condition(right)),
        }
    }

    /// `tracks.album_id IN (SELECT albums.id FROM albums WHERE <condition>)`
    fn album_where(&self, condition: SimpleExpr) -> SimpleExpr {
        let tracks = &self.schema.tracks;
        let albums = &self.schema.albums;

        let subquery = Query::select()
            .column(column(&albums.table, &albums.id))
            .from(table(&albums.table))
            .and_where(condition)
            .to_owned();

        col(&tracks.table, &tracks.album_id).in_subquery(subquery)
    }

    /// Rows of the track/label link for the current track, optionally
    /// restricted to one label name.
    fn track_labels(&self, name: Option<&str>) -> SelectStatement {
        let tracks = &self.schema.tracks;
        let link = &self.schema.track_labels;
        let labels = &self.schema.labels;

        let mut select = Query::select();
        select
            .expr(Expr::val(1))
            .from(table(&link.table))
            .and_where(
                col(&link.table, &link.track_id).equals(column(&tracks.table, &tracks.id)),
            );

        if let Some(name) = name {
            select
                .inner_join(
                    table(&labels.table),
                    col(&labels.table, &labels.id).equals(column(&link.table, &link.other_id)),
                )
                .and_where(col(&labels.table, &labels.name).eq(name));
        }

        select
    }

    /// Rows of the track/artist link for the current track and artist name.
    fn track_artists(&self, name: &str) -> SelectStatement {
        let tracks = &self.schema.tracks;
        let link = &self.schema.track_artists;
        let artists = &self.schema.artists;

        Query::select()
            .expr(Expr::val(1))
            .from(table(&link.table))
            .inner_join(
                table(&artists.table),
                col(&artists.table, &artists.id).equals(column(&link.table, &link.other_id)),
            )
            .and_where(
                col(&link.table, &link.track_id).equals(column(&tracks.table, &tracks.id)),
            )
            .and_where(col(&artists.table, &artists.name).eq(name))
            .to_owned()
    }
}

fn compare(column: Expr, bound: &Bound) -> SimpleExpr {
    match *bound {
        Bound::GreaterThan(t) => column.gt(t),
        Bound::GreaterOrEqual(t) => column.gte(t),
        Bound::LessThan(t) => column.lt(t),
        Bound::LessOrEqual(t) => column.lte(t),
    }
}
