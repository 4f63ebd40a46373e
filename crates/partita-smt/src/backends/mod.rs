pub mod smtlib_printer;
pub mod truth_table;
