pub mod batch_record;
