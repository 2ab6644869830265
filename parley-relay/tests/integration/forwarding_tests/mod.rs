mod test_signal_forwarded_by_identity;
