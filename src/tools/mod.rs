pub mod supplier_search;
