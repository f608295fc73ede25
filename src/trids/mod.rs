pub mod edge_iterator;
pub mod tri_data_structure;
pub mod tri_iterator;
