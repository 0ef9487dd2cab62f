use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::model;
use paygate_common::requests::{CreateWithdrawRequest, UpdateWithdrawRequest};
use paygate_services::{LedgerQueryService, LedgerStatsService, WithdrawCommandService};

use super::convert;
use super::pb;
use super::pb::withdraw_command_server::WithdrawCommand;
use super::pb::withdraw_query_server::WithdrawQuery;
use super::pb::withdraw_stats_server::WithdrawStats;

pub struct WithdrawQueryRpc {
    service: Arc<LedgerQueryService<model::Withdraw>>,
}

impl WithdrawQueryRpc {
    pub fn new(service: Arc<LedgerQueryService<model::Withdraw>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl WithdrawQuery for WithdrawQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::WithdrawListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::withdraw_list(page)))
    }

    async fn find_all_by_card_number(
        &self,
        request: Request<pb::CardNumberPageRequest>,
    ) -> Result<Response<pb::WithdrawListReply>, Status> {
        let req = request.into_inner();
        let filter = convert::pagination(req.filter);
        let page = self
            .service
            .find_all_by_card_number(req.card_number, filter)
            .await?;
        Ok(Response::new(convert::withdraw_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::WithdrawReply>, Status> {
        let row = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::WithdrawReply {
            withdraw: Some(convert::withdraw(&row)),
        }))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::WithdrawListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::withdraw_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::WithdrawListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::withdraw_list(page)))
    }
}

pub struct WithdrawCommandRpc {
    service: Arc<WithdrawCommandService>,
}

impl WithdrawCommandRpc {
    pub fn new(service: Arc<WithdrawCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl WithdrawCommand for WithdrawCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateWithdrawRequest>,
    ) -> Result<Response<pb::WithdrawReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .create(CreateWithdrawRequest {
                card_number: req.card_number,
                withdraw_amount: req.withdraw_amount,
                withdraw_time: req.withdraw_time,
            })
            .await?;
        Ok(Response::new(pb::WithdrawReply {
            withdraw: Some(convert::withdraw(&row)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateWithdrawRequest>,
    ) -> Result<Response<pb::WithdrawReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .update(UpdateWithdrawRequest {
                id: req.id,
                card_number: req.card_number,
                withdraw_amount: req.withdraw_amount,
                withdraw_time: req.withdraw_time,
            })
            .await?;
        Ok(Response::new(pb::WithdrawReply {
            withdraw: Some(convert::withdraw(&row)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::WithdrawReply>, Status> {
        let row = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::WithdrawReply {
            withdraw: Some(convert::withdraw(&row)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::WithdrawReply>, Status> {
        let row = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::WithdrawReply {
            withdraw: Some(convert::withdraw(&row)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct WithdrawStatsRpc {
    service: Arc<LedgerStatsService<model::Withdraw>>,
}

impl WithdrawStatsRpc {
    pub fn new(service: Arc<LedgerStatsService<model::Withdraw>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl WithdrawStats for WithdrawStatsRpc {
    async fn get_stats(
        &self,
        request: Request<pb::StatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let query = convert::stats_query(request.into_inner()).map_err(Status::from)?;
        let series = self.service.get_stats(query).await?;
        Ok(Response::new(convert::stats_reply(series)))
    }
}
