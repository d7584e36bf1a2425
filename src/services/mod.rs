pub mod reconciler;
pub mod result_store;
pub mod workbook;
