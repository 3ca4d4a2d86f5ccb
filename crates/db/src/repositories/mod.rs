pub mod batch_record_repo;
