use super::*;

impl PenaltyService {
    /// Whitelists a user, clearing their penalties and blacklist membership.
    pub async fn add_to_whitelist(&self, user_id: &str) -> AppResult<()> {
        let user_id = NonEmptyString::new(user_id)?;

        self.repository
            .remove_from_list(UserList::Blacklist, user_id.as_str())
            .await?;
        self.repository.clear_penalties(user_id.as_str()).await?;
        self.repository
            .add_to_list(UserList::Whitelist, user_id.as_str())
            .await?;

        info!(user_id = %user_id.as_str(), "user whitelisted");
        Ok(())
    }

    /// Blacklists a user, removing any whitelist membership.
    pub async fn add_to_blacklist(&self, user_id: &str) -> AppResult<()> {
        let user_id = NonEmptyString::new(user_id)?;

        self.repository
            .remove_from_list(UserList::Whitelist, user_id.as_str())
            .await?;
        self.repository
            .add_to_list(UserList::Blacklist, user_id.as_str())
            .await?;

        info!(user_id = %user_id.as_str(), "user blacklisted");
        Ok(())
    }

    /// Removes a user from the whitelist. Returns false if absent.
    pub async fn remove_from_whitelist(&self, user_id: &str) -> AppResult<bool> {
        self.remove_from(UserList::Whitelist, user_id).await
    }

    /// Removes a user from the blacklist. Returns false if absent.
    pub async fn remove_from_blacklist(&self, user_id: &str) -> AppResult<bool> {
        self.remove_from(UserList::Blacklist, user_id).await
    }

    /// Lists the members of an override list, sorted.
    pub async fn list_members(&self, list: UserList) -> AppResult<Vec<String>> {
        let mut members = self.repository.list_members(list).await?;
        members.sort();
        Ok(members)
    }

    async fn remove_from(&self, list: UserList, user_id: &str) -> AppResult<bool> {
        let removed = self.repository.remove_from_list(list, user_id).await?;
        if removed {
            info!(user_id, list = list.as_str(), "user removed from list");
        }
        Ok(removed)
    }
}
