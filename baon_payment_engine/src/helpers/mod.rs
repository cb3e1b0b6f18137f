mod order_key;

pub use order_key::client_order_id_for;
