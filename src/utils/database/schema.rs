use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Varchar,
    Boolean,
    /// Fixed-point `numeric`, never a float.
    Decimal,
    /// Calendar date without a time component.
    Date,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Varchar => "varchar",
            ColumnType::Boolean => "boolean",
            ColumnType::Decimal => "numeric",
            ColumnType::Date => "date",
        }
    }
}

impl ToString for ColumnType {
    fn to_string(&self) -> String {
        String::from(self.sql_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    pub target_column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    pub unique: &'static [&'static str],
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|column| column.primary_key)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.unique.contains(&column)
    }

    /// Names of the tables this one references, without duplicates.
    pub fn depends_on(&self) -> Vec<&'static str> {
        let mut deps: Vec<&'static str> = Vec::new();
        for fk in self.foreign_keys {
            if fk.references != self.name && !deps.contains(&fk.references) {
                deps.push(fk.references);
            }
        }
        deps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{table}.{column} references missing table {target}")]
    MissingTable {
        table: String,
        column: String,
        target: String,
    },

    #[error("{table}.{column} references missing column {target}.{target_column}")]
    MissingColumn {
        table: String,
        column: String,
        target: String,
        target_column: String,
    },

    #[error("{table}.{column} has a foreign key but no such column")]
    UnknownSourceColumn { table: String, column: String },

    #[error("{table}.{column} is marked unique but no such column")]
    UnknownUniqueColumn { table: String, column: String },

    #[error("{table} declares {count} primary key columns, expected exactly one")]
    PrimaryKeyCount { table: String, count: usize },

    #[error("Circular dependency between tables: {0}")]
    CircularDependency(String),
}

#[derive(Debug)]
pub struct Schema {
    pub tables: &'static [&'static Table],
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&'static Table> {
        self.tables.iter().copied().find(|table| table.name == name)
    }

    /// Collects every structural problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<SchemaError>> {
        let mut errors = Vec::new();

        for table in self.tables {
            let pk_count = table.columns.iter().filter(|c| c.primary_key).count();
            if pk_count != 1 {
                errors.push(SchemaError::PrimaryKeyCount {
                    table: table.name.to_string(),
                    count: pk_count,
                });
            }

            for column in table.unique {
                if table.column(column).is_none() {
                    errors.push(SchemaError::UnknownUniqueColumn {
                        table: table.name.to_string(),
                        column: column.to_string(),
                    });
                }
            }

            for fk in table.foreign_keys {
                if table.column(fk.column).is_none() {
                    errors.push(SchemaError::UnknownSourceColumn {
                        table: table.name.to_string(),
                        column: fk.column.to_string(),
                    });
                }

                match self.table(fk.references) {
                    None => errors.push(SchemaError::MissingTable {
                        table: table.name.to_string(),
                        column: fk.column.to_string(),
                        target: fk.references.to_string(),
                    }),
                    Some(target) if target.column(fk.target_column).is_none() => {
                        errors.push(SchemaError::MissingColumn {
                            table: table.name.to_string(),
                            column: fk.column.to_string(),
                            target: fk.references.to_string(),
                            target_column: fk.target_column.to_string(),
                        })
                    }
                    Some(_) => (),
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Orders tables so that every referenced table precedes the tables that
    /// reference it. Ties are broken by table name.
    pub fn creation_order(&self) -> Result<Vec<&'static Table>, SchemaError> {
        let index: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, table)| (table.name, i))
            .collect();

        let mut in_degree = vec![0usize; self.tables.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tables.len()];

        for (idx, table) in self.tables.iter().enumerate() {
            for dep in table.depends_on() {
                // References outside the schema are left for validate() to report
                if let Some(&dep_idx) = index.get(dep) {
                    dependents[dep_idx].push(idx);
                    in_degree[idx] += 1;
                }
            }
        }

        let mut ready: Vec<usize> = (0..self.tables.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut ordered: Vec<&'static Table> = Vec::with_capacity(self.tables.len());

        while !ready.is_empty() {
            ready.sort_by(|a, b| self.tables[*a].name.cmp(self.tables[*b].name));
            let idx = ready.remove(0);
            ordered.push(self.tables[idx]);

            for &dependent in &dependents[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if ordered.len() != self.tables.len() {
            let remaining = self
                .tables
                .iter()
                .filter(|table| !ordered.iter().any(|o| o.name == table.name))
                .map(|table| table.name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SchemaError::CircularDependency(remaining));
        }

        Ok(ordered)
    }
}

const fn id() -> Column {
    Column {
        name: "id",
        ty: ColumnType::Integer,
        nullable: false,
        primary_key: true,
    }
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: true,
        primary_key: false,
    }
}

const fn fk(column: &'static str, references: &'static str, on_delete: OnDelete) -> ForeignKey {
    ForeignKey {
        column,
        references,
        target_column: "id",
        on_delete,
    }
}

use ColumnType::{Boolean, Date, Decimal, Integer, Varchar};

pub static USERS: Table = Table {
    name: "users",
    columns: &[
        id(),
        col("name", Varchar),
        col("contact_phone", Varchar),
        col("phone_verified", Boolean),
        col("email", Varchar),
        col("email_verified", Boolean),
        col("confirmation_code", Varchar),
        col("password", Varchar),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[],
    unique: &[],
};

pub static STATE: Table = Table {
    name: "state",
    columns: &[id(), col("name", Varchar), col("code", Varchar)],
    foreign_keys: &[],
    unique: &[],
};

pub static CATEGORY: Table = Table {
    name: "category",
    columns: &[id(), col("name", Varchar)],
    foreign_keys: &[],
    unique: &[],
};

pub static STATUS_CATALOG: Table = Table {
    name: "status_catalog",
    columns: &[id(), col("name", Varchar)],
    foreign_keys: &[],
    unique: &[],
};

pub static CITY: Table = Table {
    name: "city",
    columns: &[id(), col("name", Varchar), col("state_id", Integer)],
    foreign_keys: &[fk("state_id", "state", OnDelete::Restrict)],
    unique: &[],
};

pub static ADDRESS: Table = Table {
    name: "address",
    columns: &[
        id(),
        col("street_address_1", Varchar),
        col("street_address_2", Varchar),
        col("zip_code", Varchar),
        col("delivery_instructions", Varchar),
        col("user_id", Integer),
        col("city_id", Integer),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[
        fk("user_id", "users", OnDelete::Cascade),
        fk("city_id", "city", OnDelete::Restrict),
    ],
    unique: &[],
};

pub static RESTAURANT: Table = Table {
    name: "restaurant",
    columns: &[
        id(),
        col("name", Varchar),
        col("street_address", Varchar),
        col("zip_code", Varchar),
        col("city_id", Integer),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[fk("city_id", "city", OnDelete::Restrict)],
    unique: &[],
};

pub static RESTAURANT_OWNER: Table = Table {
    name: "restaurant_owner",
    columns: &[id(), col("restaurant_id", Integer), col("owner_id", Integer)],
    foreign_keys: &[
        fk("restaurant_id", "restaurant", OnDelete::Cascade),
        fk("owner_id", "users", OnDelete::Cascade),
    ],
    unique: &["owner_id"],
};

pub static DRIVER: Table = Table {
    name: "driver",
    columns: &[
        id(),
        col("car_make", Varchar),
        col("car_model", Varchar),
        col("car_year", Integer),
        col("user_id", Integer),
        col("online", Boolean),
        col("delivering", Boolean),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[fk("user_id", "users", OnDelete::Cascade)],
    unique: &["user_id"],
};

pub static MENU_ITEM: Table = Table {
    name: "menu_item",
    columns: &[
        id(),
        col("name", Varchar),
        col("restaurant_id", Integer),
        col("category_id", Integer),
        col("description", Varchar),
        col("ingredients", Varchar),
        col("price", Decimal),
        col("active", Boolean),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[
        fk("restaurant_id", "restaurant", OnDelete::Cascade),
        fk("category_id", "category", OnDelete::SetNull),
    ],
    unique: &[],
};

pub static ORDERS: Table = Table {
    name: "orders",
    columns: &[
        id(),
        col("restaurant_id", Integer),
        col("estimated_delivery_time", Date),
        col("actual_delivery_time", Date),
        col("delivery_address_id", Integer),
        col("user_id", Integer),
        col("driver_id", Integer),
        col("price", Decimal),
        col("discount", Decimal),
        col("final_price", Decimal),
        col("comment", Varchar),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[
        fk("restaurant_id", "restaurant", OnDelete::Restrict),
        fk("delivery_address_id", "address", OnDelete::SetNull),
        fk("user_id", "users", OnDelete::Restrict),
        fk("driver_id", "driver", OnDelete::SetNull),
    ],
    unique: &[],
};

pub static ORDER_MENU_ITEM: Table = Table {
    name: "order_menu_item",
    columns: &[
        id(),
        col("order_id", Integer),
        col("menu_item_id", Integer),
        col("quantity", Integer),
        col("item_price", Decimal),
        col("price", Decimal),
        col("comment", Varchar),
    ],
    foreign_keys: &[
        fk("order_id", "orders", OnDelete::Cascade),
        fk("menu_item_id", "menu_item", OnDelete::Restrict),
    ],
    unique: &[],
};

pub static ORDER_STATUS: Table = Table {
    name: "order_status",
    columns: &[
        id(),
        col("order_id", Integer),
        col("status_catalog_id", Integer),
        col("created_at", Date),
    ],
    foreign_keys: &[
        fk("order_id", "orders", OnDelete::Cascade),
        fk("status_catalog_id", "status_catalog", OnDelete::Restrict),
    ],
    unique: &[],
};

pub static COMMENT: Table = Table {
    name: "comment",
    columns: &[
        id(),
        col("order_id", Integer),
        col("user_id", Integer),
        col("comment_text", Varchar),
        col("is_complaint", Boolean),
        col("is_praise", Boolean),
        col("created_at", Date),
        col("updated_at", Date),
    ],
    foreign_keys: &[
        fk("order_id", "orders", OnDelete::Cascade),
        fk("user_id", "users", OnDelete::SetNull),
    ],
    unique: &[],
};

pub static SCHEMA: Schema = Schema {
    tables: &[
        &ADDRESS,
        &CATEGORY,
        &CITY,
        &COMMENT,
        &DRIVER,
        &MENU_ITEM,
        &ORDER_MENU_ITEM,
        &ORDER_STATUS,
        &ORDERS,
        &RESTAURANT,
        &STATE,
        &STATUS_CATALOG,
        &USERS,
        &RESTAURANT_OWNER,
    ],
};
