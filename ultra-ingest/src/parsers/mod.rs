pub mod csv_export;
pub mod lunch_money;
