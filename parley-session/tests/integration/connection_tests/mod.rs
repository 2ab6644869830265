mod test_hangup_releases_media_once;
