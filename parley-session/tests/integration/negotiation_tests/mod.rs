mod test_candidates_queued_until_offer;
