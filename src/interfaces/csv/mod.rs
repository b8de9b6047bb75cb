pub mod callback_reader;
pub mod order_writer;
